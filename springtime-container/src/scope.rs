//! Component instances are contained in [Scope]s - containers which decide when to reuse or create
//! an instance. There are three built-in scope names:
//!
//! * [SINGLETON] - a single instance shared by a root container and every profile and nested
//! container derived from it,
//! * [TRANSIENT] - the default; a new instance for each request made to a root or profile
//! container, but a single instance for the whole lifetime of a nested container,
//! * [PROTOTYPE] - always a new instance.
//!
//! Custom scopes can be registered by name together with their [ScopeFactory]. Custom scopes live
//! as long as the container which created them.
//!
//! Note: scope resolution happens at component instantiation time, which can lead to unexpected
//! consequences if incompatible scopes are mixed together, e.g. a [singleton](SINGLETON) component
//! can depend on a [prototype](PROTOTYPE) one. In such case when creating the singleton, a new
//! instance of the dependency will be created, but then that single instance will live as long as
//! the singleton lives.

use crate::component_registry::ComponentDefinition;
use crate::instance_provider::ComponentInstanceAnyPtr;
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;
use std::any::TypeId;

pub type ScopePtr = Box<dyn Scope + Send + Sync>;

/// Name of the scope shared between a root container and its derived containers.
pub const SINGLETON: &str = "SINGLETON";

/// Name of the default scope.
pub const TRANSIENT: &str = "TRANSIENT";

/// Name of the [PrototypeScope].
pub const PROTOTYPE: &str = "PROTOTYPE";

/// A scope containing component instances. See module documentation for information on scopes.
#[cfg_attr(test, automock)]
pub trait Scope {
    /// Gets an instance requested for the given definition, if available in this scope.
    fn instance(&self, definition: &ComponentDefinition) -> Option<ComponentInstanceAnyPtr>;

    /// Stores given instance in the scope. The scope might not support storing instances and ignore
    /// it.
    fn store_instance(
        &mut self,
        definition: &ComponentDefinition,
        instance: ComponentInstanceAnyPtr,
    );

    /// Removes all stored instances, returning how many were released.
    fn clear(&mut self) -> usize;
}

/// Scope keeping a single instance per concrete component type.
#[derive(Default)]
pub struct SingletonScope {
    instances: FxHashMap<TypeId, ComponentInstanceAnyPtr>,
}

impl Scope for SingletonScope {
    #[inline]
    fn instance(&self, definition: &ComponentDefinition) -> Option<ComponentInstanceAnyPtr> {
        self.instances.get(&definition.resolved_type_id).cloned()
    }

    #[inline]
    fn store_instance(
        &mut self,
        definition: &ComponentDefinition,
        instance: ComponentInstanceAnyPtr,
    ) {
        self.instances.insert(definition.resolved_type_id, instance);
    }

    fn clear(&mut self) -> usize {
        let count = self.instances.len();
        self.instances.clear();
        count
    }
}

/// A scope which creates a new instance of a given component on each request. Stateful components
/// usually should be stored in a prototype scope.
#[derive(Default, Copy, Clone, Eq, PartialEq)]
pub struct PrototypeScope;

impl Scope for PrototypeScope {
    #[inline]
    fn instance(&self, _definition: &ComponentDefinition) -> Option<ComponentInstanceAnyPtr> {
        None
    }

    #[inline]
    fn store_instance(
        &mut self,
        _definition: &ComponentDefinition,
        _instance: ComponentInstanceAnyPtr,
    ) {
    }

    #[inline]
    fn clear(&mut self) -> usize {
        0
    }
}

/// Factory for custom [Scope]s.
#[cfg_attr(test, automock)]
pub trait ScopeFactory {
    fn create_scope(&self) -> ScopePtr;
}

#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct SingletonScopeFactory;

impl ScopeFactory for SingletonScopeFactory {
    fn create_scope(&self) -> ScopePtr {
        Box::<SingletonScope>::default()
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct PrototypeScopeFactory;

impl ScopeFactory for PrototypeScopeFactory {
    fn create_scope(&self) -> ScopePtr {
        Box::<PrototypeScope>::default()
    }
}
