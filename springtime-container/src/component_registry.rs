//! Functionality related to registering definitions of components. A
//! [Container](crate::container::Container) creates [Component] instances based on those
//! definitions, which are registered from [Registries](crate::registry::Registry).

use crate::component::{Component, ComponentDowncast, Injectable};
use crate::component_registry::registry::NamedComponentDefinitionMap;
use crate::error::{ComponentDefinitionRegistryError, ComponentInstanceProviderError};
use crate::instance_provider::{
    CastFunction, ComponentInstanceAnyPtr, ComponentInstanceProvider, ComponentInstancePtr,
};
use derivative::Derivative;
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;
use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

/// Type-erased constructor of component instances.
pub type Constructor = Arc<
    dyn Fn(
            &mut dyn ComponentInstanceProvider,
        ) -> Result<ComponentInstanceAnyPtr, ComponentInstanceProviderError>
        + Send
        + Sync,
>;

pub type ComponentDefinitionRegistryPtr = Box<dyn ComponentDefinitionRegistry + Send + Sync>;

/// Definition for a [Component] registered in a definition registry.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ComponentDefinition {
    /// Each component has at least one name, which can be used to request a specific instance.
    /// Unless given explicitly, the name is the full type name of the component.
    pub names: Vec<String>,

    /// With multiple components registered for a given type, one of them can be marked as primary
    /// and returned when requesting a single instance.
    pub is_primary: bool,

    /// The name of the [Scope](crate::scope::Scope) to use for instances of this component.
    pub scope_name: String,

    /// The id of the concrete component type.
    pub resolved_type_id: TypeId,

    /// The name of the concrete component type.
    pub resolved_type_name: &'static str,

    /// Constructor method for type-erased instances.
    #[derivative(Debug = "ignore")]
    pub constructor: Constructor,

    /// Cast function associated for given type. Please see the documentation for [CastFunction] for
    /// details on usage.
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

/// Registration information for a [Component]. Please see [ComponentDefinition] for information
/// about the meaning of the fields.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ComponentMetadata {
    pub names: Vec<String>,

    pub scope_name: String,

    #[derivative(Debug = "ignore")]
    pub constructor: Constructor,

    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

/// Registration information for an alias for a [Component] registered in a definition registry.
/// The optional name can be used to request the component by name when resolving the alias type.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ComponentAliasMetadata {
    pub is_primary: bool,

    pub name: Option<String>,

    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

/// A registry of component definitions which can be used when requesting instances via a
/// [ComponentInstanceProvider].
#[cfg_attr(test, automock)]
pub trait ComponentDefinitionRegistry {
    /// Adds a new definition for a given concrete type.
    fn register_component(
        &mut self,
        target: TypeId,
        target_name: &'static str,
        metadata: &ComponentMetadata,
    ) -> Result<(), ComponentDefinitionRegistryError>;

    /// Adds an alias `alias_type` for component of type `target_type`. This is useful when
    /// registering `dyn Trait` as an alias for a given concrete type. The target needs to be
    /// registered first.
    fn register_alias(
        &mut self,
        alias_type: TypeId,
        target_type: TypeId,
        alias_name: &'static str,
        target_name: &'static str,
        metadata: &ComponentAliasMetadata,
    ) -> Result<(), ComponentDefinitionRegistryError>;

    /// Removes all definitions registered for given alias type, so they can be replaced with
    /// another set.
    fn override_alias(&mut self, alias_type: TypeId);

    /// Returns all registered definitions for a given type.
    fn components_by_type(&self, type_id: TypeId) -> Vec<ComponentDefinition>;

    /// Returns a definition with given name, registered for given type.
    fn component_by_name(&self, name: &str, type_id: TypeId) -> Option<ComponentDefinition>;

    /// Returns the primary definition for a given type: the only one registered or the one marked
    /// as primary.
    fn primary_component(&self, type_id: TypeId) -> Option<ComponentDefinition>;

    /// Checks if given type is present in this registry.
    fn is_registered(&self, type_id: TypeId) -> bool;

    /// Checks if there's a definition with given name.
    fn is_name_registered(&self, name: &str) -> bool;

    /// Returns the name of a registered type.
    fn type_name(&self, type_id: TypeId) -> Option<&'static str>;

    /// Returns a copy of the whole registry as a map.
    fn all_definitions(&self) -> FxHashMap<TypeId, Vec<ComponentDefinition>>;
}

/// Helper trait for [ComponentDefinitionRegistry] providing strongly-typed registration.
pub trait TypedComponentDefinitionRegistry {
    /// Registers component `T` created with [Component::create].
    fn register_component_typed<T: Component>(
        &mut self,
        names: Vec<String>,
        scope_name: &str,
    ) -> Result<(), ComponentDefinitionRegistryError>;

    /// Registers `Source` as an alias of already registered component `Target`.
    fn register_alias_typed<Source: ComponentDowncast<Target> + ?Sized, Target: Component>(
        &mut self,
        is_primary: bool,
        name: Option<String>,
    ) -> Result<(), ComponentDefinitionRegistryError>;
}

impl<R: ComponentDefinitionRegistry + ?Sized> TypedComponentDefinitionRegistry for R {
    fn register_component_typed<T: Component>(
        &mut self,
        names: Vec<String>,
        scope_name: &str,
    ) -> Result<(), ComponentDefinitionRegistryError> {
        self.register_component(
            TypeId::of::<T>(),
            type_name::<T>(),
            &ComponentMetadata {
                names,
                scope_name: scope_name.to_string(),
                constructor: component_constructor::<T>(),
                cast: alias_cast::<T, T>,
            },
        )
    }

    fn register_alias_typed<Source: ComponentDowncast<Target> + ?Sized, Target: Component>(
        &mut self,
        is_primary: bool,
        name: Option<String>,
    ) -> Result<(), ComponentDefinitionRegistryError> {
        self.register_alias(
            TypeId::of::<Source>(),
            TypeId::of::<Target>(),
            type_name::<Source>(),
            type_name::<Target>(),
            &ComponentAliasMetadata {
                is_primary,
                name,
                cast: alias_cast::<Source, Target>,
            },
        )
    }
}

/// Creates a type-erased [Constructor] calling [Component::create].
pub fn component_constructor<T: Component>() -> Constructor {
    Arc::new(|instance_provider: &mut dyn ComponentInstanceProvider| {
        T::create(instance_provider)
            .map(|component| ComponentInstancePtr::new(component) as ComponentInstanceAnyPtr)
    })
}

/// [CastFunction] casting an instance of `Target` to `Source`.
pub fn alias_cast<Source: ComponentDowncast<Target> + ?Sized, Target: Component>(
    instance: ComponentInstanceAnyPtr,
) -> Result<Box<dyn Any>, ComponentInstanceAnyPtr> {
    Source::downcast(instance).map(|instance| Box::new(instance) as Box<dyn Any>)
}

/// Returns the name used for components registered without explicit names.
pub fn default_component_name<T: Injectable + ?Sized>() -> String {
    type_name::<T>().to_string()
}

/// Default [ComponentDefinitionRegistry] keeping definitions in memory.
#[derive(Clone, Debug, Default)]
pub struct DefaultComponentDefinitionRegistry {
    definition_map: NamedComponentDefinitionMap,
    allow_definition_overriding: bool,
}

impl DefaultComponentDefinitionRegistry {
    /// Creates an empty registry. When `allow_definition_overriding` is set, registering a
    /// concrete type again replaces the previous definition instead of failing.
    pub fn new(allow_definition_overriding: bool) -> Self {
        Self {
            definition_map: Default::default(),
            allow_definition_overriding,
        }
    }
}

impl ComponentDefinitionRegistry for DefaultComponentDefinitionRegistry {
    #[inline]
    fn register_component(
        &mut self,
        target: TypeId,
        target_name: &'static str,
        metadata: &ComponentMetadata,
    ) -> Result<(), ComponentDefinitionRegistryError> {
        self.definition_map.try_register_component(
            target,
            target_name,
            metadata,
            self.allow_definition_overriding,
        )
    }

    #[inline]
    fn register_alias(
        &mut self,
        alias_type: TypeId,
        target_type: TypeId,
        alias_name: &'static str,
        target_name: &'static str,
        metadata: &ComponentAliasMetadata,
    ) -> Result<(), ComponentDefinitionRegistryError> {
        self.definition_map.try_register_alias(
            alias_type,
            target_type,
            alias_name,
            target_name,
            metadata,
        )
    }

    #[inline]
    fn override_alias(&mut self, alias_type: TypeId) {
        self.definition_map.remove_alias(alias_type);
    }

    #[inline]
    fn components_by_type(&self, type_id: TypeId) -> Vec<ComponentDefinition> {
        self.definition_map.components_by_type(type_id)
    }

    #[inline]
    fn component_by_name(&self, name: &str, type_id: TypeId) -> Option<ComponentDefinition> {
        self.definition_map.component_by_name(name, type_id)
    }

    #[inline]
    fn primary_component(&self, type_id: TypeId) -> Option<ComponentDefinition> {
        self.definition_map.primary_component(type_id)
    }

    #[inline]
    fn is_registered(&self, type_id: TypeId) -> bool {
        self.definition_map.is_registered(type_id)
    }

    #[inline]
    fn is_name_registered(&self, name: &str) -> bool {
        self.definition_map.is_name_registered(name)
    }

    #[inline]
    fn type_name(&self, type_id: TypeId) -> Option<&'static str> {
        self.definition_map.type_name(type_id)
    }

    #[inline]
    fn all_definitions(&self) -> FxHashMap<TypeId, Vec<ComponentDefinition>> {
        self.definition_map.all_definitions()
    }
}

mod registry {
    use crate::component_registry::{
        ComponentAliasMetadata, ComponentDefinition, ComponentMetadata,
    };
    use crate::error::ComponentDefinitionRegistryError;
    use fxhash::{FxHashMap, FxHashSet};
    use std::any::TypeId;

    #[derive(Default, Clone, Debug)]
    pub(super) struct NamedComponentDefinitionMap {
        definitions: FxHashMap<TypeId, Vec<ComponentDefinition>>,
        type_names: FxHashMap<TypeId, &'static str>,
        // concrete component names
        names: FxHashMap<String, TypeId>,
        // names given to alias registrations
        alias_names: FxHashMap<TypeId, FxHashSet<String>>,
    }

    impl NamedComponentDefinitionMap {
        pub(super) fn component_by_name(
            &self,
            name: &str,
            type_id: TypeId,
        ) -> Option<ComponentDefinition> {
            self.definitions.get(&type_id).and_then(|definitions| {
                definitions
                    .iter()
                    .find(|definition| definition.names.iter().any(|entry| entry == name))
                    .cloned()
            })
        }

        pub(super) fn components_by_type(&self, type_id: TypeId) -> Vec<ComponentDefinition> {
            self.definitions.get(&type_id).cloned().unwrap_or_default()
        }

        pub(super) fn primary_component(&self, type_id: TypeId) -> Option<ComponentDefinition> {
            self.definitions
                .get(&type_id)
                .and_then(|definitions| match definitions.as_slice() {
                    [definition] => Some(definition),
                    definitions => definitions.iter().find(|definition| definition.is_primary),
                })
                .cloned()
        }

        pub(super) fn try_register_alias(
            &mut self,
            alias_type: TypeId,
            target_type: TypeId,
            alias_name: &'static str,
            target_name: &'static str,
            metadata: &ComponentAliasMetadata,
        ) -> Result<(), ComponentDefinitionRegistryError> {
            let mut target_definitions = self
                .definitions
                .get(&target_type)
                .ok_or(ComponentDefinitionRegistryError::MissingBaseComponent {
                    alias_type: alias_name.to_string(),
                    target_type: target_name.to_string(),
                })
                .cloned()?;

            if let Some(name) = &metadata.name {
                if self
                    .alias_names
                    .get(&alias_type)
                    .map(|names| names.contains(name))
                    .unwrap_or(false)
                {
                    return Err(ComponentDefinitionRegistryError::DuplicateComponentName(
                        name.clone(),
                    ));
                }
            }

            for definition in &mut target_definitions {
                definition.is_primary = metadata.is_primary;
                definition.cast = metadata.cast;

                if let Some(name) = &metadata.name {
                    definition.names.push(name.clone());
                }
            }

            if let Some(alias_definitions) = self.definitions.get_mut(&alias_type) {
                if metadata.is_primary
                    && alias_definitions
                        .iter()
                        .any(|definition| definition.is_primary)
                {
                    return Err(
                        ComponentDefinitionRegistryError::DuplicatePrimaryComponent {
                            alias_type: alias_name.to_string(),
                            target_type: target_name.to_string(),
                        },
                    );
                }

                alias_definitions.append(&mut target_definitions);
            } else {
                self.definitions.insert(alias_type, target_definitions);
            }

            if let Some(name) = &metadata.name {
                self.alias_names
                    .entry(alias_type)
                    .or_default()
                    .insert(name.clone());
            }

            self.type_names.insert(alias_type, alias_name);

            Ok(())
        }

        pub(super) fn remove_alias(&mut self, alias_type: TypeId) {
            // concrete types are never overridden this way
            if self
                .definitions
                .get(&alias_type)
                .map(|definitions| {
                    definitions
                        .iter()
                        .any(|definition| definition.resolved_type_id == alias_type)
                })
                .unwrap_or(false)
            {
                return;
            }

            self.definitions.remove(&alias_type);
            self.alias_names.remove(&alias_type);
        }

        pub(super) fn try_register_component(
            &mut self,
            target: TypeId,
            target_name: &'static str,
            metadata: &ComponentMetadata,
            allow_definition_overriding: bool,
        ) -> Result<(), ComponentDefinitionRegistryError> {
            if !allow_definition_overriding {
                if let Some(name) = metadata.names.iter().find_map(|name| {
                    if self.names.contains_key(name) {
                        Some(name.clone())
                    } else {
                        None
                    }
                }) {
                    return Err(ComponentDefinitionRegistryError::DuplicateComponentName(
                        name,
                    ));
                }
            }

            let definition = ComponentDefinition {
                names: metadata.names.clone(),
                is_primary: false,
                scope_name: metadata.scope_name.clone(),
                resolved_type_id: target,
                resolved_type_name: target_name,
                constructor: metadata.constructor.clone(),
                cast: metadata.cast,
            };

            let names = definition.names.clone();

            if let Some(entries) = self.definitions.get_mut(&target) {
                // concrete component types should not have multiple definitions
                debug_assert!(entries.len() <= 1);

                if !allow_definition_overriding && !entries.is_empty() {
                    return Err(ComponentDefinitionRegistryError::DuplicateComponentType(
                        target_name.to_string(),
                    ));
                }

                entries
                    .iter()
                    .flat_map(|entry| entry.names.iter())
                    .for_each(|name| {
                        self.names.remove(name);
                    });

                *entries = vec![definition];
            } else {
                self.definitions.insert(target, vec![definition]);
            }

            self.names
                .extend(names.into_iter().map(|name| (name, target)));
            self.type_names.insert(target, target_name);

            Ok(())
        }

        #[inline]
        pub(super) fn is_registered(&self, target: TypeId) -> bool {
            self.definitions
                .get(&target)
                .map(|definitions| !definitions.is_empty())
                .unwrap_or(false)
        }

        #[inline]
        pub(super) fn is_name_registered(&self, name: &str) -> bool {
            self.names.contains_key(name)
                || self
                    .alias_names
                    .values()
                    .any(|names| names.contains(name))
        }

        #[inline]
        pub(super) fn type_name(&self, type_id: TypeId) -> Option<&'static str> {
            self.type_names.get(&type_id).copied()
        }

        #[inline]
        pub(super) fn all_definitions(&self) -> FxHashMap<TypeId, Vec<ComponentDefinition>> {
            self.definitions.clone()
        }
    }

    #[cfg(test)]
    mod tests {
        use crate::component_registry::registry::NamedComponentDefinitionMap;
        use crate::component_registry::{ComponentAliasMetadata, ComponentMetadata};
        use crate::error::{ComponentDefinitionRegistryError, ComponentInstanceProviderError};
        use crate::instance_provider::{
            ComponentInstanceAnyPtr, ComponentInstanceProvider, ComponentInstancePtr,
        };
        use crate::scope::TRANSIENT;
        use std::any::{Any, TypeId};
        use std::sync::Arc;

        fn cast(
            instance: ComponentInstanceAnyPtr,
        ) -> Result<Box<dyn Any>, ComponentInstanceAnyPtr> {
            Err(instance)
        }

        fn create_metadata() -> (ComponentMetadata, TypeId) {
            fn constructor(
                _instance_provider: &mut dyn ComponentInstanceProvider,
            ) -> Result<ComponentInstanceAnyPtr, ComponentInstanceProviderError> {
                Ok(ComponentInstancePtr::new(0) as ComponentInstanceAnyPtr)
            }

            (
                ComponentMetadata {
                    names: vec!["name".to_string()],
                    scope_name: TRANSIENT.to_string(),
                    constructor: Arc::new(constructor),
                    cast,
                },
                TypeId::of::<i8>(),
            )
        }

        fn alias_metadata(is_primary: bool, name: Option<&str>) -> ComponentAliasMetadata {
            ComponentAliasMetadata {
                is_primary,
                name: name.map(str::to_string),
                cast,
            }
        }

        #[test]
        fn should_register_definition() {
            let (definition, id) = create_metadata();

            let mut registry = NamedComponentDefinitionMap::default();
            registry
                .try_register_component(id, "i8", &definition, false)
                .unwrap();

            assert_eq!(registry.components_by_type(id)[0].names, definition.names);
            assert_eq!(
                registry.component_by_name("name", id).unwrap().names,
                definition.names
            );
            assert!(registry.is_registered(id));
            assert!(registry.is_name_registered("name"));
            assert_eq!(registry.type_name(id), Some("i8"));
        }

        #[test]
        fn should_not_register_duplicate_name() {
            let (definition, id) = create_metadata();

            let mut registry = NamedComponentDefinitionMap::default();
            registry
                .try_register_component(id, "", &definition, false)
                .unwrap();

            assert!(matches!(
                registry
                    .try_register_component(id, "", &definition, false)
                    .unwrap_err(),
                ComponentDefinitionRegistryError::DuplicateComponentName(..)
            ));
        }

        #[test]
        fn should_override_duplicate_name() {
            let (definition, id) = create_metadata();

            let mut registry = NamedComponentDefinitionMap::default();
            registry
                .try_register_component(id, "", &definition, true)
                .unwrap();
            registry
                .try_register_component(id, "", &definition, true)
                .unwrap();

            assert_eq!(registry.components_by_type(id).len(), 1);
        }

        #[test]
        fn should_register_alias() {
            let (definition, id) = create_metadata();
            let alias_id = TypeId::of::<u8>();

            let mut registry = NamedComponentDefinitionMap::default();
            registry
                .try_register_component(id, "", &definition, false)
                .unwrap();
            registry
                .try_register_alias(alias_id, id, "", "", &alias_metadata(false, Some("alias")))
                .unwrap();

            let alias_definitions = registry.components_by_type(alias_id);
            assert_eq!(alias_definitions[0].resolved_type_id, id);
            assert!(registry.component_by_name("alias", alias_id).is_some());
            assert!(registry.component_by_name("alias", id).is_none());
            assert!(registry.is_name_registered("alias"));
        }

        #[test]
        fn should_reject_alias_without_target() {
            let mut registry = NamedComponentDefinitionMap::default();

            assert!(matches!(
                registry
                    .try_register_alias(
                        TypeId::of::<u8>(),
                        TypeId::of::<i8>(),
                        "u8",
                        "i8",
                        &alias_metadata(false, None)
                    )
                    .unwrap_err(),
                ComponentDefinitionRegistryError::MissingBaseComponent { .. }
            ));
        }

        #[test]
        fn should_reject_duplicate_primary_alias() {
            let (definition, id) = create_metadata();
            let alias_id = TypeId::of::<u8>();

            let mut registry = NamedComponentDefinitionMap::default();
            registry
                .try_register_component(id, "", &definition, false)
                .unwrap();
            registry
                .try_register_alias(alias_id, id, "", "", &alias_metadata(true, None))
                .unwrap();

            assert!(matches!(
                registry
                    .try_register_alias(alias_id, id, "", "", &alias_metadata(true, None))
                    .unwrap_err(),
                ComponentDefinitionRegistryError::DuplicatePrimaryComponent { .. }
            ));
        }

        #[test]
        fn should_select_primary_definition() {
            let (definition, id) = create_metadata();
            let other_id = TypeId::of::<i16>();
            let alias_id = TypeId::of::<u8>();

            let mut registry = NamedComponentDefinitionMap::default();
            registry
                .try_register_component(id, "", &definition, false)
                .unwrap();
            registry
                .try_register_component(
                    other_id,
                    "",
                    &ComponentMetadata {
                        names: vec!["other".to_string()],
                        ..definition.clone()
                    },
                    false,
                )
                .unwrap();
            registry
                .try_register_alias(alias_id, id, "", "", &alias_metadata(false, None))
                .unwrap();
            registry
                .try_register_alias(alias_id, other_id, "", "", &alias_metadata(false, None))
                .unwrap();

            assert!(registry.primary_component(alias_id).is_none());

            registry.remove_alias(alias_id);
            registry
                .try_register_alias(alias_id, id, "", "", &alias_metadata(false, None))
                .unwrap();
            registry
                .try_register_alias(alias_id, other_id, "", "", &alias_metadata(true, None))
                .unwrap();

            assert_eq!(
                registry.primary_component(alias_id).unwrap().resolved_type_id,
                other_id
            );
        }

        #[test]
        fn should_not_remove_concrete_definitions_as_aliases() {
            let (definition, id) = create_metadata();

            let mut registry = NamedComponentDefinitionMap::default();
            registry
                .try_register_component(id, "", &definition, false)
                .unwrap();
            registry.remove_alias(id);

            assert!(registry.is_registered(id));
        }
    }
}
