//! Inversion of control container, which creates components and manages their lifetime.
//!
//! Components are types implementing [Component](component::Component), registered in a
//! [Registry](registry::Registry) either explicitly or by [scanning](scanning) linked code and
//! dynamic libraries. A [Container](container::Container) built from a registry resolves component
//! instances by type or by name, keeping them in [scopes](scope).
//!
//! ```
//! use springtime_container::component::Component;
//! use springtime_container::container::Container;
//! use springtime_container::instance_provider::{
//!     ComponentInstanceProvider, ComponentInstanceProviderError, ComponentInstancePtr,
//!     TypedComponentInstanceProvider,
//! };
//!
//! struct Repository;
//!
//! impl Component for Repository {
//!     fn create(
//!         _instance_provider: &mut dyn ComponentInstanceProvider,
//!     ) -> Result<Self, ComponentInstanceProviderError> {
//!         Ok(Self)
//!     }
//! }
//!
//! struct Service {
//!     repository: ComponentInstancePtr<Repository>,
//! }
//!
//! impl Component for Service {
//!     fn create(
//!         instance_provider: &mut dyn ComponentInstanceProvider,
//!     ) -> Result<Self, ComponentInstanceProviderError> {
//!         Ok(Self {
//!             repository: instance_provider.primary_instance_typed()?,
//!         })
//!     }
//! }
//!
//! let container = Container::configure(|registry| {
//!     registry.register::<Repository>().singleton();
//!     registry.register::<Service>();
//! })
//! .unwrap();
//!
//! let first = container.get_instance::<Service>().unwrap();
//! let second = container.get_instance::<Service>().unwrap();
//! assert!(ComponentInstancePtr::ptr_eq(&first.repository, &second.repository));
//! ```

pub mod component;
pub mod component_registry;
pub mod container;
mod error;
pub mod instance_provider;
pub mod registry;
pub mod scanning;
pub mod scope;

pub use error::{
    ComponentDefinitionRegistryError, ComponentInstanceProviderError, ContainerError,
    ValidationFailure,
};
