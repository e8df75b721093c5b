//! The [Container] creates components based on definitions registered from a
//! [Registry](crate::registry::Registry) and keeps their instances in [scopes](crate::scope).
//!
//! A root container can derive two kinds of containers:
//!
//! * profile containers - where registrations of a named profile override the default ones,
//! * nested containers - short-lived containers tracking their own [TRANSIENT] instances, meant to
//! be [disposed](Container::dispose) when some unit of work ends.
//!
//! All derived containers share [SINGLETON] instances with their root.

use crate::component::Injectable;
use crate::component_registry::{
    ComponentDefinition, ComponentDefinitionRegistry, ComponentDefinitionRegistryPtr,
    DefaultComponentDefinitionRegistry,
};
use crate::error::{ContainerError, ValidationFailure};
use crate::instance_provider::{
    CastFunction, ComponentInstanceAnyPtr, ComponentInstanceProvider,
    ComponentInstanceProviderError, ComponentInstancePtr, TypedComponentInstanceProvider,
};
use crate::registry::{ComponentRegistration, Registry, ScopeFactoryPtr};
use crate::scope::{
    PrototypeScopeFactory, ScopePtr, SingletonScopeFactory, PROTOTYPE, SINGLETON, TRANSIENT,
};
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use libloading::Library;
use std::any::TypeId;
use std::fmt::{Display, Formatter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

type ScopeMap = FxHashMap<String, ScopePtr>;

/// Kind of a [Container].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ContainerKind {
    Root,
    Profile,
    Nested,
}

impl Display for ContainerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerKind::Root => write!(f, "root"),
            ContainerKind::Profile => write!(f, "profile"),
            ContainerKind::Nested => write!(f, "nested"),
        }
    }
}

#[derive(Default)]
struct ProfileSources {
    registrations: Vec<ComponentRegistration>,
    profiles: FxHashMap<String, Vec<ComponentRegistration>>,
}

// profiles are cached by their root, so they only hold a weak reference back
enum ParentRef {
    Derived(Arc<ContainerInner>),
    Root(Weak<ContainerInner>),
}

impl ParentRef {
    fn upgrade(&self) -> Option<Arc<ContainerInner>> {
        match self {
            ParentRef::Derived(parent) => Some(parent.clone()),
            ParentRef::Root(root) => root.upgrade(),
        }
    }
}

struct ContainerInner {
    kind: ContainerKind,
    definition_registry: Arc<dyn ComponentDefinitionRegistry + Send + Sync>,
    scope_factories: FxHashMap<String, ScopeFactoryPtr>,
    shared_scopes: Arc<Mutex<ScopeMap>>,
    local_scopes: Mutex<ScopeMap>,
    profile_sources: Arc<ProfileSources>,
    profiles: Mutex<FxHashMap<String, Container>>,
    parent: Option<ParentRef>,
    disposed: AtomicBool,
    // needs to be dropped after everything created by library code
    _libraries: Arc<Vec<Arc<Library>>>,
}

impl ContainerInner {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
            || self
                .parent
                .as_ref()
                .map(|parent| {
                    parent
                        .upgrade()
                        .map(|parent| parent.is_disposed())
                        .unwrap_or(true)
                })
                .unwrap_or(false)
    }

    fn root(self: &Arc<Self>) -> Option<Arc<Self>> {
        match &self.parent {
            Some(parent) => parent.upgrade()?.root(),
            None => Some(self.clone()),
        }
    }

    fn derive(
        self: &Arc<Self>,
        kind: ContainerKind,
        definition_registry: Arc<dyn ComponentDefinitionRegistry + Send + Sync>,
        scope_factories: FxHashMap<String, ScopeFactoryPtr>,
    ) -> Self {
        Self {
            kind,
            definition_registry,
            scope_factories,
            shared_scopes: self.shared_scopes.clone(),
            local_scopes: Default::default(),
            profile_sources: self.profile_sources.clone(),
            profiles: Default::default(),
            parent: Some(match kind {
                ContainerKind::Profile => ParentRef::Root(Arc::downgrade(self)),
                _ => ParentRef::Derived(self.clone()),
            }),
            disposed: AtomicBool::new(false),
            _libraries: self._libraries.clone(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn default_scope_factories() -> FxHashMap<String, ScopeFactoryPtr> {
    [
        (
            SINGLETON.to_string(),
            Arc::new(SingletonScopeFactory) as ScopeFactoryPtr,
        ),
        (
            TRANSIENT.to_string(),
            Arc::new(PrototypeScopeFactory) as ScopeFactoryPtr,
        ),
        (
            PROTOTYPE.to_string(),
            Arc::new(PrototypeScopeFactory) as ScopeFactoryPtr,
        ),
    ]
    .into_iter()
    .collect()
}

fn register_definitions(
    definition_registry: &mut dyn ComponentDefinitionRegistry,
    registrations: &[ComponentRegistration],
    override_aliases: bool,
) -> Result<(), ContainerError> {
    for registration in registrations {
        if registration.replace_existing || !definition_registry.is_registered(registration.target)
        {
            definition_registry.register_component(
                registration.target,
                registration.target_name,
                &registration.metadata,
            )?;
        }
    }

    if override_aliases {
        for alias_type in registrations
            .iter()
            .flat_map(|registration| registration.aliases.iter())
            .map(|alias| alias.alias_type)
            .unique()
        {
            definition_registry.override_alias(alias_type);
        }
    }

    let mut registered_aliases = FxHashSet::default();
    for registration in registrations {
        for alias in &registration.aliases {
            // the same alias can come from both explicit and convention registrations
            if registered_aliases.insert((alias.alias_type, registration.target)) {
                definition_registry.register_alias(
                    alias.alias_type,
                    registration.target,
                    alias.alias_name,
                    registration.target_name,
                    &alias.metadata,
                )?;
            }
        }
    }

    Ok(())
}

/// Inversion of control container. Cloning a container is cheap and results in a handle to the
/// same container.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// Creates a new root container from the given registry, resolving all scanning instructions.
    pub fn new(registry: Registry) -> Result<Self, ContainerError> {
        let resolved = registry.resolve()?;

        let mut definition_registry = DefaultComponentDefinitionRegistry::new(true);
        register_definitions(&mut definition_registry, &resolved.registrations, false)?;

        // profiles are built lazily, but errors should surface early
        for (name, registrations) in &resolved.profiles {
            debug!("Verifying profile {}.", name);

            let mut profile_registry = definition_registry.clone();
            register_definitions(&mut profile_registry, registrations, true)?;
        }

        let mut scope_factories = default_scope_factories();
        scope_factories.extend(resolved.scope_factories);

        debug!(
            "Created root container with {} registrations and {} profiles.",
            resolved.registrations.len(),
            resolved.profiles.len()
        );

        Ok(Self::from_parts(
            Box::new(definition_registry),
            scope_factories,
            ProfileSources {
                registrations: resolved.registrations,
                profiles: resolved.profiles,
            },
            resolved.libraries,
        ))
    }

    /// Creates a new root container configured by the given function.
    pub fn configure<F: FnOnce(&mut Registry)>(configure: F) -> Result<Self, ContainerError> {
        let mut registry = Registry::new();
        configure(&mut registry);
        Self::new(registry)
    }

    /// Creates a root container using a custom definition registry and scope factories. Such
    /// container has no profiles. The factory map should include built-in [SINGLETON], [TRANSIENT]
    /// and [PROTOTYPE] scopes, unless no component uses them.
    pub fn from_definition_registry(
        definition_registry: ComponentDefinitionRegistryPtr,
        scope_factories: FxHashMap<String, ScopeFactoryPtr>,
    ) -> Self {
        Self::from_parts(
            definition_registry,
            scope_factories,
            Default::default(),
            vec![],
        )
    }

    fn from_parts(
        definition_registry: ComponentDefinitionRegistryPtr,
        scope_factories: FxHashMap<String, ScopeFactoryPtr>,
        profile_sources: ProfileSources,
        libraries: Vec<Arc<Library>>,
    ) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                kind: ContainerKind::Root,
                definition_registry: Arc::from(definition_registry),
                scope_factories,
                shared_scopes: Default::default(),
                local_scopes: Default::default(),
                profile_sources: Arc::new(profile_sources),
                profiles: Default::default(),
                parent: None,
                disposed: AtomicBool::new(false),
                _libraries: Arc::new(libraries),
            }),
        }
    }

    #[inline]
    pub fn kind(&self) -> ContainerKind {
        self.inner.kind
    }

    /// Checks if this container, or the one it was derived from, has been disposed.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Checks if both handles point to the same container.
    #[inline]
    pub fn same_container(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the primary instance of `T`.
    pub fn get_instance<T: Injectable + ?Sized>(
        &self,
    ) -> Result<ComponentInstancePtr<T>, ComponentInstanceProviderError> {
        ResolutionSession::new(&self.inner).primary_instance_typed()
    }

    /// Returns the primary instance of `T` or `None`, if `T` is not registered.
    pub fn try_get_instance<T: Injectable + ?Sized>(
        &self,
    ) -> Result<Option<ComponentInstancePtr<T>>, ComponentInstanceProviderError> {
        ResolutionSession::new(&self.inner).primary_instance_option()
    }

    /// Returns an instance of `T` registered under given name.
    pub fn get_named_instance<T: Injectable + ?Sized>(
        &self,
        name: &str,
    ) -> Result<ComponentInstancePtr<T>, ComponentInstanceProviderError> {
        ResolutionSession::new(&self.inner).instance_by_name_typed(name)
    }

    /// Returns instances of all components registered for `T`.
    pub fn get_all_instances<T: Injectable + ?Sized>(
        &self,
    ) -> Result<Vec<ComponentInstancePtr<T>>, ComponentInstanceProviderError> {
        ResolutionSession::new(&self.inner).instances_typed()
    }

    /// Creates a nested container, which shares definitions and singletons with this one, but keeps
    /// its own [TRANSIENT] instances until disposed.
    pub fn nested_container(&self) -> Container {
        let mut scope_factories = self.inner.scope_factories.clone();
        scope_factories.insert(
            TRANSIENT.to_string(),
            Arc::new(SingletonScopeFactory) as ScopeFactoryPtr,
        );

        Container {
            inner: Arc::new(self.inner.derive(
                ContainerKind::Nested,
                self.inner.definition_registry.clone(),
                scope_factories,
            )),
        }
    }

    /// Returns the container for a named profile. Registrations from the profile override default
    /// registrations of the same alias types. Asking for an unknown profile returns a container
    /// with the default registrations. Profile containers are cached by the root container and
    /// do not keep it alive.
    pub fn get_profile(&self, name: &str) -> Result<Container, ContainerError> {
        let root = self.inner.root().ok_or(ContainerError::Disposed)?;

        let mut profiles = lock(&root.profiles);
        if let Some(profile) = profiles.get(name) {
            return Ok(profile.clone());
        }

        let definition_registry: Arc<dyn ComponentDefinitionRegistry + Send + Sync> =
            match root.profile_sources.profiles.get(name) {
                Some(registrations) => {
                    let mut definition_registry = DefaultComponentDefinitionRegistry::new(true);
                    register_definitions(
                        &mut definition_registry,
                        &root.profile_sources.registrations,
                        false,
                    )?;
                    register_definitions(&mut definition_registry, registrations, true)?;

                    Arc::new(definition_registry)
                }
                None => root.definition_registry.clone(),
            };

        debug!("Created container for profile {}.", name);

        let profile = Container {
            inner: Arc::new(root.derive(
                ContainerKind::Profile,
                definition_registry,
                root.scope_factories.clone(),
            )),
        };

        profiles.insert(name.to_string(), profile.clone());
        Ok(profile)
    }

    /// Tries to create every registered component in a throwaway nested container and reports all
    /// failures.
    pub fn assert_configuration_is_valid(&self) -> Result<(), ContainerError> {
        let nested = self.nested_container();

        let definitions = self
            .inner
            .definition_registry
            .all_definitions()
            .into_values()
            .flatten()
            .unique_by(|definition| definition.resolved_type_id)
            .sorted_by_key(|definition| definition.resolved_type_name)
            .collect_vec();

        let failures = {
            let mut session = ResolutionSession::new(&nested.inner);
            definitions
                .into_iter()
                .filter_map(|definition| {
                    session
                        .create_instance(&definition)
                        .err()
                        .map(|error| ValidationFailure {
                            type_name: definition.resolved_type_name,
                            names: definition.names.clone(),
                            error,
                        })
                })
                .collect_vec()
        };

        nested.dispose();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::InvalidConfiguration(failures))
        }
    }

    /// Describes all registrations of this container.
    pub fn what_do_i_have(&self) -> String {
        let registry = &self.inner.definition_registry;
        let mut report = format!("{} container\n", self.inner.kind);

        for (type_id, definitions) in registry
            .all_definitions()
            .into_iter()
            .sorted_by_key(|(type_id, _)| registry.type_name(*type_id).unwrap_or_default())
        {
            let _ = writeln!(
                report,
                "{}",
                registry.type_name(type_id).unwrap_or("<unknown>")
            );

            for definition in definitions {
                let _ = writeln!(
                    report,
                    "    {} | scope: {} | names: {}{}",
                    definition.resolved_type_name,
                    definition.scope_name,
                    definition.names.iter().join(", "),
                    if definition.is_primary {
                        " | primary"
                    } else {
                        ""
                    }
                );
            }
        }

        report
    }

    /// Disposes the container, releasing all instances it tracks. Disposing a root container also
    /// releases singletons and disposes all derived containers. Disposing an already disposed
    /// container does nothing.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut released: usize = lock(&self.inner.local_scopes)
            .values_mut()
            .map(|scope| scope.clear())
            .sum();

        if self.inner.kind == ContainerKind::Root {
            released += lock(&self.inner.shared_scopes)
                .values_mut()
                .map(|scope| scope.clear())
                .sum::<usize>();

            for (_, profile) in lock(&self.inner.profiles).drain() {
                profile.dispose();
            }
        }

        debug!(
            "Disposed {} container, released {} instances.",
            self.inner.kind, released
        );
    }
}

impl ComponentInstanceProvider for Container {
    fn primary_instance(
        &mut self,
        type_id: TypeId,
    ) -> Result<(ComponentInstanceAnyPtr, CastFunction), ComponentInstanceProviderError> {
        ResolutionSession::new(&self.inner).primary_instance(type_id)
    }

    fn instances(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<(ComponentInstanceAnyPtr, CastFunction)>, ComponentInstanceProviderError> {
        ResolutionSession::new(&self.inner).instances(type_id)
    }

    fn instance_by_name(
        &mut self,
        name: &str,
        type_id: TypeId,
    ) -> Result<(ComponentInstanceAnyPtr, CastFunction), ComponentInstanceProviderError> {
        ResolutionSession::new(&self.inner).instance_by_name(name, type_id)
    }
}

/// State of a single resolution request.
struct ResolutionSession<'c> {
    container: &'c ContainerInner,
    types_under_construction: FxHashSet<TypeId>,
}

impl<'c> ResolutionSession<'c> {
    fn new(container: &'c ContainerInner) -> Self {
        Self {
            container,
            types_under_construction: Default::default(),
        }
    }

    fn scopes(&self, definition: &ComponentDefinition) -> &Mutex<ScopeMap> {
        if definition.scope_name == SINGLETON {
            &self.container.shared_scopes
        } else {
            &self.container.local_scopes
        }
    }

    fn create_instance(
        &mut self,
        definition: &ComponentDefinition,
    ) -> Result<(ComponentInstanceAnyPtr, CastFunction), ComponentInstanceProviderError> {
        if self.container.is_disposed() {
            return Err(ComponentInstanceProviderError::ContainerDisposed);
        }

        if self
            .types_under_construction
            .contains(&definition.resolved_type_id)
        {
            return Err(ComponentInstanceProviderError::DependencyCycle(
                definition.resolved_type_id,
            ));
        }

        {
            let mut scopes = lock(self.scopes(definition));
            if !scopes.contains_key(&definition.scope_name) {
                let factory = self
                    .container
                    .scope_factories
                    .get(&definition.scope_name)
                    .ok_or_else(|| {
                        ComponentInstanceProviderError::UnrecognizedScope(
                            definition.scope_name.to_string(),
                        )
                    })?;

                scopes.insert(definition.scope_name.clone(), factory.create_scope());
            }

            if let Some(instance) = scopes
                .get(&definition.scope_name)
                .and_then(|scope| scope.instance(definition))
            {
                return Ok((instance, definition.cast));
            }
        }

        self.types_under_construction
            .insert(definition.resolved_type_id);
        let instance = (definition.constructor)(self);
        self.types_under_construction
            .remove(&definition.resolved_type_id);

        let instance = instance?;

        let mut scopes = lock(self.scopes(definition));
        let scope = scopes.get_mut(&definition.scope_name).ok_or_else(|| {
            ComponentInstanceProviderError::UnrecognizedScope(definition.scope_name.to_string())
        })?;

        // another request might have finished first
        if let Some(existing) = scope.instance(definition) {
            return Ok((existing, definition.cast));
        }

        scope.store_instance(definition, instance.clone());

        Ok((instance, definition.cast))
    }
}

impl ComponentInstanceProvider for ResolutionSession<'_> {
    fn primary_instance(
        &mut self,
        type_id: TypeId,
    ) -> Result<(ComponentInstanceAnyPtr, CastFunction), ComponentInstanceProviderError> {
        let definition = self
            .container
            .definition_registry
            .primary_component(type_id)
            .ok_or(ComponentInstanceProviderError::NoPrimaryInstance(type_id))?;

        self.create_instance(&definition)
    }

    fn instances(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<(ComponentInstanceAnyPtr, CastFunction)>, ComponentInstanceProviderError> {
        let definitions = self.container.definition_registry.components_by_type(type_id);
        definitions
            .iter()
            .map(|definition| self.create_instance(definition))
            .collect()
    }

    fn instance_by_name(
        &mut self,
        name: &str,
        type_id: TypeId,
    ) -> Result<(ComponentInstanceAnyPtr, CastFunction), ComponentInstanceProviderError> {
        let definition = self
            .container
            .definition_registry
            .component_by_name(name, type_id)
            .ok_or_else(|| ComponentInstanceProviderError::NoNamedInstance(name.to_string()))?;

        self.create_instance(&definition)
    }
}

#[cfg(test)]
mod tests {
    use crate::component_registry::{ComponentDefinition, MockComponentDefinitionRegistry};
    use crate::container::Container;
    use crate::instance_provider::{
        ComponentInstanceAnyPtr, ComponentInstanceProvider, ComponentInstanceProviderError,
        ComponentInstancePtr,
    };
    use crate::registry::ScopeFactoryPtr;
    use crate::scope::{MockScope, MockScopeFactory, PrototypeScopeFactory, ScopePtr, PROTOTYPE};
    use mockall::predicate::*;
    use std::any::{Any, TypeId};
    use std::sync::Arc;

    fn cast(instance: ComponentInstanceAnyPtr) -> Result<Box<dyn Any>, ComponentInstanceAnyPtr> {
        Err(instance)
    }

    fn constructor(
        _instance_provider: &mut dyn ComponentInstanceProvider,
    ) -> Result<ComponentInstanceAnyPtr, ComponentInstanceProviderError> {
        Ok(ComponentInstancePtr::new(0) as ComponentInstanceAnyPtr)
    }

    fn error_constructor(
        _instance_provider: &mut dyn ComponentInstanceProvider,
    ) -> Result<ComponentInstanceAnyPtr, ComponentInstanceProviderError> {
        Err(ComponentInstanceProviderError::NoPrimaryInstance(
            TypeId::of::<i8>(),
        ))
    }

    fn recursive_constructor(
        instance_provider: &mut dyn ComponentInstanceProvider,
    ) -> Result<ComponentInstanceAnyPtr, ComponentInstanceProviderError> {
        instance_provider
            .primary_instance(TypeId::of::<i8>())
            .map(|(instance, _)| instance)
    }

    fn create_definition(
        scope_name: &str,
        constructor: fn(
            &mut dyn ComponentInstanceProvider,
        ) -> Result<ComponentInstanceAnyPtr, ComponentInstanceProviderError>,
    ) -> ComponentDefinition {
        ComponentDefinition {
            names: vec!["name".to_string()],
            is_primary: false,
            scope_name: scope_name.to_string(),
            resolved_type_id: TypeId::of::<i8>(),
            resolved_type_name: "i8",
            constructor: Arc::new(constructor),
            cast,
        }
    }

    fn create_container(definition_registry: MockComponentDefinitionRegistry) -> Container {
        Container::from_definition_registry(
            Box::new(definition_registry),
            [(
                PROTOTYPE.to_string(),
                Arc::new(PrototypeScopeFactory) as ScopeFactoryPtr,
            )]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn should_return_primary_instance() {
        let id = TypeId::of::<i8>();

        let mut registry = MockComponentDefinitionRegistry::new();
        registry
            .expect_primary_component()
            .with(eq(id))
            .times(1)
            .return_const(Some(create_definition(PROTOTYPE, constructor)));

        let mut container = create_container(registry);
        assert!(container.primary_instance(id).is_ok());
    }

    #[test]
    fn should_detect_primary_instance_loops() {
        let id = TypeId::of::<i8>();

        let mut registry = MockComponentDefinitionRegistry::new();
        registry
            .expect_primary_component()
            .with(eq(id))
            .times(2)
            .return_const(Some(create_definition(PROTOTYPE, recursive_constructor)));

        let mut container = create_container(registry);
        assert_eq!(
            container.primary_instance(id).unwrap_err(),
            ComponentInstanceProviderError::DependencyCycle(id)
        );
    }

    #[test]
    fn should_not_return_missing_primary_instance() {
        let id = TypeId::of::<i8>();

        let mut registry = MockComponentDefinitionRegistry::new();
        registry
            .expect_primary_component()
            .with(eq(id))
            .times(1)
            .return_const(None);

        let mut container = create_container(registry);
        assert_eq!(
            container.primary_instance(id).unwrap_err(),
            ComponentInstanceProviderError::NoPrimaryInstance(id)
        );
    }

    #[test]
    fn should_recognize_primary_instance_missing_scope() {
        let id = TypeId::of::<i8>();

        let mut registry = MockComponentDefinitionRegistry::new();
        registry
            .expect_primary_component()
            .with(eq(id))
            .times(1)
            .return_const(Some(create_definition("CUSTOM", constructor)));

        let mut container = create_container(registry);
        assert_eq!(
            container.primary_instance(id).unwrap_err(),
            ComponentInstanceProviderError::UnrecognizedScope("CUSTOM".to_string())
        );
    }

    #[test]
    fn should_forward_primary_instance_constructor_error() {
        let id = TypeId::of::<i8>();

        let mut registry = MockComponentDefinitionRegistry::new();
        registry
            .expect_primary_component()
            .with(eq(id))
            .times(1)
            .return_const(Some(create_definition(PROTOTYPE, error_constructor)));

        let mut container = create_container(registry);
        assert_eq!(
            container.primary_instance(id).unwrap_err(),
            ComponentInstanceProviderError::NoPrimaryInstance(id)
        );
    }

    #[test]
    fn should_store_primary_instance_in_scope() {
        let id = TypeId::of::<i8>();

        let mut registry = MockComponentDefinitionRegistry::new();
        registry
            .expect_primary_component()
            .with(eq(id))
            .times(1)
            .return_const(Some(create_definition(PROTOTYPE, constructor)));

        let mut scope_factory = MockScopeFactory::new();
        scope_factory.expect_create_scope().returning(|| {
            let mut scope = MockScope::new();
            scope.expect_store_instance().times(1).return_const(());
            scope.expect_instance().return_const(None);

            Box::new(scope) as ScopePtr
        });

        let mut container = Container::from_definition_registry(
            Box::new(registry),
            [(
                PROTOTYPE.to_string(),
                Arc::new(scope_factory) as ScopeFactoryPtr,
            )]
            .into_iter()
            .collect(),
        );

        container.primary_instance(id).unwrap();
    }

    #[test]
    fn should_return_all_instances() {
        let id = TypeId::of::<i8>();
        let definition = create_definition(PROTOTYPE, constructor);

        let mut registry = MockComponentDefinitionRegistry::new();
        registry
            .expect_components_by_type()
            .with(eq(id))
            .times(1)
            .return_const(vec![definition.clone(), definition]);

        let mut container = create_container(registry);
        assert_eq!(container.instances(id).unwrap().len(), 2);
    }

    #[test]
    fn should_return_instance_by_name() {
        let id = TypeId::of::<i8>();

        let mut registry = MockComponentDefinitionRegistry::new();
        registry
            .expect_component_by_name()
            .with(eq("name"), eq(id))
            .times(1)
            .return_const(Some(create_definition(PROTOTYPE, constructor)));

        let mut container = create_container(registry);
        assert!(container.instance_by_name("name", id).is_ok());
    }

    #[test]
    fn should_refuse_resolution_after_dispose() {
        let id = TypeId::of::<i8>();

        let mut registry = MockComponentDefinitionRegistry::new();
        registry
            .expect_primary_component()
            .with(eq(id))
            .return_const(Some(create_definition(PROTOTYPE, constructor)));

        let mut container = create_container(registry);
        let nested = container.nested_container();

        container.dispose();
        container.dispose();

        assert!(nested.is_disposed());
        assert_eq!(
            container.primary_instance(id).unwrap_err(),
            ComponentInstanceProviderError::ContainerDisposed
        );
    }
}
