//! One of the basic blocks of dependency injection is a [Component]. Components are injectable
//! objects, which themselves can contain dependencies to other components.
//!
//! ## Implementing components
//!
//! Any type which wants to be managed by the container needs to implement `Component`, which
//! tells the container how to create an instance using other components as dependencies:
//!
//! ```
//! use springtime_container::component::Component;
//! use springtime_container::instance_provider::{
//!     ComponentInstanceProvider, ComponentInstanceProviderError, ComponentInstancePtr,
//!     TypedComponentInstanceProvider,
//! };
//! use springtime_container::{component_alias, injectable};
//!
//! trait Greeter {
//!     fn greet(&self) -> String;
//! }
//!
//! injectable!(dyn Greeter + Send + Sync);
//!
//! struct EnglishGreeter;
//!
//! impl Greeter for EnglishGreeter {
//!     fn greet(&self) -> String {
//!         "hello".to_string()
//!     }
//! }
//!
//! impl Component for EnglishGreeter {
//!     fn create(
//!         _instance_provider: &mut dyn ComponentInstanceProvider,
//!     ) -> Result<Self, ComponentInstanceProviderError> {
//!         Ok(Self)
//!     }
//! }
//!
//! component_alias!(dyn Greeter + Send + Sync => EnglishGreeter);
//!
//! struct Reception {
//!     greeter: ComponentInstancePtr<dyn Greeter + Send + Sync>,
//! }
//!
//! impl Component for Reception {
//!     fn create(
//!         instance_provider: &mut dyn ComponentInstanceProvider,
//!     ) -> Result<Self, ComponentInstanceProviderError> {
//!         Ok(Self {
//!             greeter: instance_provider.primary_instance_typed()?,
//!         })
//!     }
//! }
//! ```
//!
//! ## Component aliases
//!
//! Component aliases are different types, which can refer to a concrete component type. Usually
//! they are `dyn Trait + Send + Sync` types, which makes it possible to inject an abstraction
//! instead of a concrete component type. Each alias type needs to be marked with [injectable!] and
//! each implementation connected with [component_alias!].

use crate::error::ComponentInstanceProviderError;
use crate::instance_provider::{
    ComponentInstanceAnyPtr, ComponentInstanceProvider, ComponentInstancePtr,
};

/// Base trait for components for dependency injection.
///
/// Components might depend on other components, which forms the basis for dependency injection. To
/// make the system work, your component instances are wrapped in a [ComponentInstancePtr].
pub trait Component: ComponentDowncast<Self> + Sized + Send + Sync {
    /// Creates an instance of this component using dependencies from given [ComponentInstanceProvider].
    fn create(
        instance_provider: &mut dyn ComponentInstanceProvider,
    ) -> Result<Self, ComponentInstanceProviderError>;
}

/// Helper trait for traits implemented by components, thus allowing injection of components based
/// on `dyn Trait` types. The type `C` refers to a concrete component type. Typically implemented
/// with the [component_alias!] macro.
pub trait ComponentDowncast<C: Component>: Injectable {
    fn downcast(
        source: ComponentInstanceAnyPtr,
    ) -> Result<ComponentInstancePtr<Self>, ComponentInstanceAnyPtr>;
}

impl<C: Component> ComponentDowncast<C> for C {
    #[inline]
    fn downcast(
        source: ComponentInstanceAnyPtr,
    ) -> Result<ComponentInstancePtr<Self>, ComponentInstanceAnyPtr> {
        source.downcast()
    }
}

/// Marker trait for injectable types - components and aliases.
pub trait Injectable: 'static {}

impl<C: Component> Injectable for C {}

/// Marks given alias type, typically `dyn Trait + Send + Sync`, as [Injectable].
#[macro_export]
macro_rules! injectable {
    ($($alias:ty),+ $(,)?) => {
        $(impl $crate::component::Injectable for $alias {})+
    };
}

/// Implements [ComponentDowncast] for an alias type of a concrete component, which allows
/// requesting the component as the alias, e.g. `component_alias!(dyn Trait + Send + Sync => Type)`.
#[macro_export]
macro_rules! component_alias {
    ($alias:ty => $component:ty) => {
        impl $crate::component::ComponentDowncast<$component> for $alias {
            fn downcast(
                source: $crate::instance_provider::ComponentInstanceAnyPtr,
            ) -> Result<
                $crate::instance_provider::ComponentInstancePtr<Self>,
                $crate::instance_provider::ComponentInstanceAnyPtr,
            > {
                source.downcast::<$component>().map(|instance| {
                    instance as $crate::instance_provider::ComponentInstancePtr<Self>
                })
            }
        }
    };
}
