//! [Registry] is the configuration expression for a [Container](crate::container::Container). It
//! collects component registrations, named profiles, custom scopes and scanning instructions,
//! which are resolved when the container gets built.
//!
//! ```
//! use springtime_container::component::Component;
//! use springtime_container::instance_provider::{
//!     ComponentInstanceProvider, ComponentInstanceProviderError,
//! };
//! use springtime_container::registry::Registry;
//! use springtime_container::{component_alias, injectable};
//!
//! trait Clock {}
//!
//! injectable!(dyn Clock + Send + Sync);
//!
//! struct SystemClock;
//! struct FrozenClock;
//!
//! impl Clock for SystemClock {}
//! impl Clock for FrozenClock {}
//!
//! impl Component for SystemClock {
//!     fn create(
//!         _instance_provider: &mut dyn ComponentInstanceProvider,
//!     ) -> Result<Self, ComponentInstanceProviderError> {
//!         Ok(Self)
//!     }
//! }
//!
//! impl Component for FrozenClock {
//!     fn create(
//!         _instance_provider: &mut dyn ComponentInstanceProvider,
//!     ) -> Result<Self, ComponentInstanceProviderError> {
//!         Ok(Self)
//!     }
//! }
//!
//! component_alias!(dyn Clock + Send + Sync => SystemClock);
//! component_alias!(dyn Clock + Send + Sync => FrozenClock);
//!
//! let mut registry = Registry::new();
//! registry
//!     .register::<SystemClock>()
//!     .singleton()
//!     .alias::<dyn Clock + Send + Sync>();
//!
//! registry.profile("testing", |profile| {
//!     profile
//!         .register::<FrozenClock>()
//!         .alias::<dyn Clock + Send + Sync>();
//! });
//! ```

use crate::component::{Component, ComponentDowncast};
use crate::component_registry::{
    alias_cast, component_constructor, default_component_name, ComponentAliasMetadata,
    ComponentMetadata,
};
use crate::error::{ComponentInstanceProviderError, ContainerError};
use crate::instance_provider::{ComponentInstanceAnyPtr, ComponentInstanceProvider};
use crate::scanning::{PluginTypeInfo, ScannedType, Scanner};
use crate::scope::{ScopeFactory, PROTOTYPE, SINGLETON, TRANSIENT};
use fxhash::{FxHashMap, FxHashSet};
use libloading::Library;
use std::any::{type_name, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

pub type ScopeFactoryPtr = Arc<dyn ScopeFactory + Send + Sync>;

/// Registration of an alias for a component.
#[derive(Clone, Debug)]
pub struct AliasRegistration {
    pub alias_type: TypeId,
    pub alias_name: &'static str,
    pub metadata: ComponentAliasMetadata,
}

/// Registration of a concrete component together with its aliases.
#[derive(Clone, Debug)]
pub struct ComponentRegistration {
    pub target: TypeId,
    pub target_name: &'static str,
    pub metadata: ComponentMetadata,
    pub aliases: Vec<AliasRegistration>,
    /// Should this registration replace an existing one for the same concrete type. Convention
    /// registrations only fill the gaps left by explicit ones.
    pub replace_existing: bool,
}

/// Registrations and scope factories after resolving all scanning instructions.
#[derive(Default)]
pub(crate) struct ResolvedRegistry {
    pub(crate) registrations: Vec<ComponentRegistration>,
    pub(crate) profiles: FxHashMap<String, Vec<ComponentRegistration>>,
    pub(crate) scope_factories: FxHashMap<String, ScopeFactoryPtr>,
    pub(crate) libraries: Vec<Arc<Library>>,
}

/// Configuration expression for a [Container](crate::container::Container). See module
/// documentation for an example.
#[derive(Default)]
pub struct Registry {
    registrations: Vec<ComponentRegistration>,
    profiles: FxHashMap<String, Registry>,
    scope_factories: FxHashMap<String, ScopeFactoryPtr>,
    scanners: Vec<Scanner>,
    included: Vec<Registry>,
}

impl Registry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers component `C` created with [Component::create], in the [TRANSIENT] scope unless
    /// configured otherwise.
    pub fn register<C: Component>(&mut self) -> ComponentExpression<'_, C> {
        self.push_component::<C>(component_constructor::<C>())
    }

    /// Registers component `C` created by the given function.
    pub fn register_with<C, F>(&mut self, constructor: F) -> ComponentExpression<'_, C>
    where
        C: Component,
        F: Fn(&mut dyn ComponentInstanceProvider) -> Result<C, ComponentInstanceProviderError>
            + Send
            + Sync
            + 'static,
    {
        self.push_component::<C>(Arc::new(
            move |instance_provider: &mut dyn ComponentInstanceProvider| {
                constructor(instance_provider)
                    .map(|component| Arc::new(component) as ComponentInstanceAnyPtr)
            },
        ))
    }

    /// Registers an existing object as a [SINGLETON] component.
    pub fn instance<C: Component>(&mut self, instance: C) -> ComponentExpression<'_, C> {
        let instance = Arc::new(instance) as ComponentInstanceAnyPtr;
        self.push_component::<C>(Arc::new(
            move |_: &mut dyn ComponentInstanceProvider| -> Result<
                ComponentInstanceAnyPtr,
                ComponentInstanceProviderError,
            > { Ok(instance.clone()) },
        ))
        .singleton()
    }

    /// Adds a registration created elsewhere, e.g. by a convention.
    pub fn add_registration(&mut self, registration: ComponentRegistration) -> &mut Self {
        self.registrations.push(registration);
        self
    }

    /// Registers a scanned component as an implementation of given plugin type. This never
    /// replaces an existing registration of the same concrete type, but adds the alias to it.
    pub fn add_plugin(
        &mut self,
        plugin_type: &PluginTypeInfo,
        component: &ScannedType,
        scope_name: &str,
        name: Option<String>,
    ) -> &mut Self {
        let mut names = vec![component.type_name.to_string()];
        let mut aliases = vec![];

        if plugin_type.type_id == component.type_id {
            names.extend(name);
        } else {
            aliases.push(AliasRegistration {
                alias_type: plugin_type.type_id,
                alias_name: plugin_type.type_name,
                metadata: ComponentAliasMetadata {
                    is_primary: false,
                    name,
                    cast: plugin_type.cast,
                },
            });
        }

        self.add_registration(ComponentRegistration {
            target: component.type_id,
            target_name: component.type_name,
            metadata: ComponentMetadata {
                names,
                scope_name: scope_name.to_string(),
                constructor: component.constructor.clone(),
                cast: component.cast,
            },
            aliases,
            replace_existing: false,
        })
    }

    /// Configures a named profile. Profile registrations override the default ones for every
    /// alias type they register.
    pub fn profile<F: FnOnce(&mut Registry)>(&mut self, name: &str, configure: F) -> &mut Self {
        configure(self.profiles.entry(name.to_string()).or_default());
        self
    }

    /// Registers a factory for a custom scope.
    pub fn scope_factory(&mut self, name: &str, factory: ScopeFactoryPtr) -> &mut Self {
        self.scope_factories.insert(name.to_string(), factory);
        self
    }

    /// Configures module scanning, which happens when the container is built.
    pub fn scan<F: FnOnce(&mut Scanner)>(&mut self, configure: F) -> &mut Self {
        let mut scanner = Scanner::new();
        configure(&mut scanner);
        self.scanners.push(scanner);
        self
    }

    /// Includes all configuration from another registry.
    pub fn include(&mut self, registry: Registry) -> &mut Self {
        self.included.push(registry);
        self
    }

    /// Returns registrations added directly to this registry.
    #[inline]
    pub fn registrations(&self) -> &[ComponentRegistration] {
        &self.registrations
    }

    fn push_component<C: Component>(
        &mut self,
        constructor: crate::component_registry::Constructor,
    ) -> ComponentExpression<'_, C> {
        self.registrations.push(ComponentRegistration {
            target: TypeId::of::<C>(),
            target_name: type_name::<C>(),
            metadata: ComponentMetadata {
                names: vec![default_component_name::<C>()],
                scope_name: TRANSIENT.to_string(),
                constructor,
                cast: alias_cast::<C, C>,
            },
            aliases: vec![],
            replace_existing: true,
        });

        let index = self.registrations.len() - 1;
        ComponentExpression {
            registration: &mut self.registrations[index],
            _component: PhantomData,
        }
    }

    pub(crate) fn resolve(self) -> Result<ResolvedRegistry, ContainerError> {
        let mut resolved = ResolvedRegistry::default();
        self.resolve_into(&mut resolved, &mut Default::default())?;
        Ok(resolved)
    }

    fn resolve_into(
        self,
        resolved: &mut ResolvedRegistry,
        visited_registries: &mut FxHashSet<String>,
    ) -> Result<(), ContainerError> {
        resolved.registrations.extend(self.registrations);
        resolved.scope_factories.extend(self.scope_factories);

        for (name, profile) in self.profiles {
            let mut profile_resolved = ResolvedRegistry::default();
            profile.resolve_into(&mut profile_resolved, visited_registries)?;

            resolved
                .profiles
                .entry(name.clone())
                .or_default()
                .extend(profile_resolved.registrations);
            resolved
                .scope_factories
                .extend(profile_resolved.scope_factories);
            resolved.libraries.extend(profile_resolved.libraries);

            // profiles declared within a profile are merged as top-level profiles
            for (nested_name, registrations) in profile_resolved.profiles {
                debug!("Merging profile {} declared in profile {}.", nested_name, name);

                resolved
                    .profiles
                    .entry(nested_name)
                    .or_default()
                    .extend(registrations);
            }
        }

        for scanner in self.scanners {
            let scan_result = scanner.scan()?;
            resolved.libraries.extend(scan_result.libraries);

            let mut found = Registry::new();
            for convention in scanner.conventions() {
                convention.scan_types(&scan_result.types, &mut found);
            }

            if scanner.is_looking_for_registries() {
                for scanned in scan_result.registries {
                    let key = format!("{}/{}", scanned.module.name, scanned.name);
                    if visited_registries.insert(key) {
                        debug!("Including registry {} from {}.", scanned.name, scanned.module);
                        found.include((scanned.create)());
                    }
                }
            }

            found.resolve_into(resolved, visited_registries)?;
        }

        for registry in self.included {
            registry.resolve_into(resolved, visited_registries)?;
        }

        Ok(())
    }
}

/// Fluent configuration of a single component registration.
pub struct ComponentExpression<'r, C: Component> {
    registration: &'r mut ComponentRegistration,
    _component: PhantomData<fn() -> C>,
}

impl<C: Component> ComponentExpression<'_, C> {
    /// Uses the [SINGLETON] scope.
    pub fn singleton(self) -> Self {
        self.scoped(SINGLETON)
    }

    /// Uses the [PROTOTYPE] scope.
    pub fn prototype(self) -> Self {
        self.scoped(PROTOTYPE)
    }

    /// Uses the [TRANSIENT] scope.
    pub fn transient(self) -> Self {
        self.scoped(TRANSIENT)
    }

    /// Uses a scope with the given name.
    pub fn scoped(self, scope_name: &str) -> Self {
        self.registration.metadata.scope_name = scope_name.to_string();
        self
    }

    /// Replaces the default name of the component.
    pub fn named(self, name: &str) -> Self {
        self.registration.metadata.names = vec![name.to_string()];
        self
    }

    /// Registers the component as an implementation of `Source`.
    pub fn alias<Source: ComponentDowncast<C> + ?Sized>(self) -> Self {
        self.push_alias::<Source>(false, None)
    }

    /// Registers the component as the primary implementation of `Source`.
    pub fn primary_alias<Source: ComponentDowncast<C> + ?Sized>(self) -> Self {
        self.push_alias::<Source>(true, None)
    }

    /// Registers the component as an implementation of `Source` available under given name.
    pub fn named_alias<Source: ComponentDowncast<C> + ?Sized>(self, name: &str) -> Self {
        self.push_alias::<Source>(false, Some(name.to_string()))
    }

    fn push_alias<Source: ComponentDowncast<C> + ?Sized>(
        self,
        is_primary: bool,
        name: Option<String>,
    ) -> Self {
        self.registration.aliases.push(AliasRegistration {
            alias_type: TypeId::of::<Source>(),
            alias_name: type_name::<Source>(),
            metadata: ComponentAliasMetadata {
                is_primary,
                name,
                cast: alias_cast::<Source, C>,
            },
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::component::Component;
    use crate::error::ComponentInstanceProviderError;
    use crate::instance_provider::ComponentInstanceProvider;
    use crate::registry::Registry;
    use crate::scanning::{ModuleInfo, ScannedType};
    use crate::scope::{PROTOTYPE, SINGLETON, TRANSIENT};
    use std::any::TypeId;

    trait TestTrait {}

    crate::injectable!(dyn TestTrait + Send + Sync);

    struct TestComponent;

    impl TestTrait for TestComponent {}

    impl Component for TestComponent {
        fn create(
            _instance_provider: &mut dyn ComponentInstanceProvider,
        ) -> Result<Self, ComponentInstanceProviderError> {
            Ok(Self)
        }
    }

    crate::component_alias!(dyn TestTrait + Send + Sync => TestComponent);

    #[test]
    fn should_default_to_transient_scope() {
        let mut registry = Registry::new();
        registry.register::<TestComponent>();

        let registration = &registry.registrations()[0];
        assert_eq!(registration.metadata.scope_name, TRANSIENT);
        assert_eq!(registration.target, TypeId::of::<TestComponent>());
        assert!(registration.replace_existing);
    }

    #[test]
    fn should_configure_registration() {
        let mut registry = Registry::new();
        registry
            .register::<TestComponent>()
            .prototype()
            .named("test")
            .primary_alias::<dyn TestTrait + Send + Sync>();

        let registration = &registry.registrations()[0];
        assert_eq!(registration.metadata.scope_name, PROTOTYPE);
        assert_eq!(registration.metadata.names, vec!["test".to_string()]);
        assert_eq!(registration.aliases.len(), 1);
        assert!(registration.aliases[0].metadata.is_primary);
    }

    #[test]
    fn should_register_instances_as_singletons() {
        let mut registry = Registry::new();
        registry.instance(TestComponent);

        assert_eq!(registry.registrations()[0].metadata.scope_name, SINGLETON);
    }

    #[test]
    fn should_add_plugins_without_replacing() {
        let scanned = ScannedType::of::<TestComponent>(ModuleInfo::linked("test", "test.rs"))
            .plugin::<dyn TestTrait + Send + Sync, TestComponent>();
        let plugin_type = scanned.plugin_types[0];

        let mut registry = Registry::new();
        registry.add_plugin(&plugin_type, &scanned, SINGLETON, Some("named".to_string()));

        let registration = &registry.registrations()[0];
        assert!(!registration.replace_existing);
        assert_eq!(registration.metadata.scope_name, SINGLETON);
        assert_eq!(
            registration.aliases[0].metadata.name.as_deref(),
            Some("named")
        );
    }

    #[test]
    fn should_name_self_plugins() {
        let scanned = ScannedType::of::<TestComponent>(ModuleInfo::linked("test", "test.rs"));

        let mut registry = Registry::new();
        registry.add_plugin(
            &scanned.as_plugin_type(),
            &scanned,
            TRANSIENT,
            Some("named".to_string()),
        );

        let registration = &registry.registrations()[0];
        assert!(registration.aliases.is_empty());
        assert!(registration
            .metadata
            .names
            .contains(&"named".to_string()));
    }

    #[test]
    fn should_resolve_profiles_and_includes() {
        let mut included = Registry::new();
        included.register::<TestComponent>();

        let mut registry = Registry::new();
        registry.include(included);
        registry.profile("test", |profile| {
            profile.register::<TestComponent>().singleton();
        });

        let resolved = registry.resolve().unwrap();
        assert_eq!(resolved.registrations.len(), 1);
        assert_eq!(resolved.profiles["test"].len(), 1);
    }

    #[test]
    fn should_merge_profiles_declared_in_profiles() {
        let mut extension = Registry::new();
        extension.profile("reports", |profile| {
            profile.register::<TestComponent>();
        });

        let mut registry = Registry::new();
        registry.profile("test", |profile| {
            profile.register::<TestComponent>().singleton();
            profile.include(extension);
        });

        let resolved = registry.resolve().unwrap();
        assert!(resolved.registrations.is_empty());
        assert_eq!(resolved.profiles["test"].len(), 1);
        assert_eq!(resolved.profiles["reports"].len(), 1);
    }
}
