use crate::instance_provider::ErrorPtr;
use itertools::Itertools;
use std::any::TypeId;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Errors related to creating and managing components.
#[derive(Error, Clone, Debug)]
pub enum ComponentInstanceProviderError {
    #[error("Cannot find a primary instance for component '{0:?}' - either none or multiple exists without a primary marker.")]
    NoPrimaryInstance(TypeId),
    #[error("Tried to downcast component to incompatible type: {0:?}")]
    IncompatibleComponent(TypeId),
    #[error("Cannot find named component: {0}")]
    NoNamedInstance(String),
    #[error("Unrecognized scope: {0}")]
    UnrecognizedScope(String),
    #[error("Detected dependency cycle for: {0:?}")]
    DependencyCycle(TypeId),
    #[error("Tried to resolve a component from a disposed container")]
    ContainerDisposed,
    #[error("Error in component constructor: {0}")]
    ConstructorError(ErrorPtr),
}

impl PartialEq for ComponentInstanceProviderError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NoPrimaryInstance(lhs), Self::NoPrimaryInstance(rhs))
            | (Self::IncompatibleComponent(lhs), Self::IncompatibleComponent(rhs))
            | (Self::DependencyCycle(lhs), Self::DependencyCycle(rhs)) => lhs == rhs,
            (Self::NoNamedInstance(lhs), Self::NoNamedInstance(rhs))
            | (Self::UnrecognizedScope(lhs), Self::UnrecognizedScope(rhs)) => lhs == rhs,
            (Self::ContainerDisposed, Self::ContainerDisposed) => true,
            (Self::ConstructorError(lhs), Self::ConstructorError(rhs)) => {
                lhs.to_string() == rhs.to_string()
            }
            _ => false,
        }
    }
}

/// Error related to component registries.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ComponentDefinitionRegistryError {
    #[error("Attempted to register a duplicated component with name: {0}")]
    DuplicateComponentName(String),
    #[error("Attempted to re-register a concrete component type: {0}")]
    DuplicateComponentType(String),
    #[error("Missing base component of type {target_type} for alias: {alias_type}")]
    MissingBaseComponent {
        alias_type: String,
        target_type: String,
    },
    #[error(
        "Registering a duplicate primary component of type {target_type} for alias: {alias_type}"
    )]
    DuplicatePrimaryComponent {
        alias_type: String,
        target_type: String,
    },
}

/// A single component which could not be built during container validation.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationFailure {
    pub type_name: &'static str,
    pub names: Vec<String>,
    pub error: ComponentInstanceProviderError,
}

impl Display for ValidationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.type_name,
            self.names.iter().join(", "),
            self.error
        )
    }
}

/// Errors related to building and verifying [Container](crate::container::Container)s.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ContainerError {
    #[error("Invalid component registration: {0}")]
    Registration(#[from] ComponentDefinitionRegistryError),
    #[error("Cannot load module {path}: {message}")]
    ModuleLoad { path: String, message: String },
    #[error("Container configuration is invalid:\n{}", .0.iter().join("\n"))]
    InvalidConfiguration(Vec<ValidationFailure>),
    #[error("The container has been disposed or its root container has been dropped.")]
    Disposed,
}
