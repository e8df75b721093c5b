//! Functionality related to providing component instances.

use crate::component::Injectable;
pub use crate::error::ComponentInstanceProviderError;
use std::any::{Any, TypeId};
use std::error::Error;
use std::sync::Arc;

pub type ComponentInstancePtr<T> = Arc<T>;

pub type ComponentInstanceAnyPtr = ComponentInstancePtr<dyn Any + Send + Sync + 'static>;

/// Shared pointer to an arbitrary error, e.g. one returned by a custom constructor.
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Casts a type-erased instance to a `Box<ComponentInstancePtr<T>>` hidden behind `Box<dyn Any>`,
/// where `T` is the type the instance was requested as. Returns the original pointer on failure.
pub type CastFunction =
    fn(instance: ComponentInstanceAnyPtr) -> Result<Box<dyn Any>, ComponentInstanceAnyPtr>;

/// Generic provider for component instances.
pub trait ComponentInstanceProvider {
    /// Tries to return a primary instance of a given component. A primary component is either the
    /// only one registered or one marked as primary.
    fn primary_instance(
        &mut self,
        type_id: TypeId,
    ) -> Result<(ComponentInstanceAnyPtr, CastFunction), ComponentInstanceProviderError>;

    /// Tries to create all available instances of a given component type.
    fn instances(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<(ComponentInstanceAnyPtr, CastFunction)>, ComponentInstanceProviderError>;

    /// Tries to return an instance with the given name and type.
    fn instance_by_name(
        &mut self,
        name: &str,
        type_id: TypeId,
    ) -> Result<(ComponentInstanceAnyPtr, CastFunction), ComponentInstanceProviderError>;
}

/// Helper trait for [ComponentInstanceProvider] providing strongly-typed access.
pub trait TypedComponentInstanceProvider {
    /// Typesafe version of [ComponentInstanceProvider::primary_instance].
    fn primary_instance_typed<T: Injectable + ?Sized>(
        &mut self,
    ) -> Result<ComponentInstancePtr<T>, ComponentInstanceProviderError>;

    /// Tries to get an instance like [TypedComponentInstanceProvider::primary_instance_typed] does,
    /// but returns `None` on missing instance.
    fn primary_instance_option<T: Injectable + ?Sized>(
        &mut self,
    ) -> Result<Option<ComponentInstancePtr<T>>, ComponentInstanceProviderError>;

    /// Typesafe version of [ComponentInstanceProvider::instances].
    fn instances_typed<T: Injectable + ?Sized>(
        &mut self,
    ) -> Result<Vec<ComponentInstancePtr<T>>, ComponentInstanceProviderError>;

    /// Typesafe version of [ComponentInstanceProvider::instance_by_name].
    fn instance_by_name_typed<T: Injectable + ?Sized>(
        &mut self,
        name: &str,
    ) -> Result<ComponentInstancePtr<T>, ComponentInstanceProviderError>;

    /// Tries to get an instance like [TypedComponentInstanceProvider::instance_by_name_typed]
    /// does, but returns `None` on missing instance.
    fn instance_by_name_option<T: Injectable + ?Sized>(
        &mut self,
        name: &str,
    ) -> Result<Option<ComponentInstancePtr<T>>, ComponentInstanceProviderError>;
}

pub(crate) fn cast_instance<T: Injectable + ?Sized>(
    instance: ComponentInstanceAnyPtr,
    cast: CastFunction,
) -> Result<ComponentInstancePtr<T>, ComponentInstanceProviderError> {
    cast(instance)
        .map_err(|_| ComponentInstanceProviderError::IncompatibleComponent(TypeId::of::<T>()))?
        .downcast::<ComponentInstancePtr<T>>()
        .map(|instance| *instance)
        .map_err(|_| ComponentInstanceProviderError::IncompatibleComponent(TypeId::of::<T>()))
}

impl<CIP: ComponentInstanceProvider + ?Sized> TypedComponentInstanceProvider for CIP {
    fn primary_instance_typed<T: Injectable + ?Sized>(
        &mut self,
    ) -> Result<ComponentInstancePtr<T>, ComponentInstanceProviderError> {
        let (instance, cast) = self.primary_instance(TypeId::of::<T>())?;
        cast_instance(instance, cast)
    }

    fn primary_instance_option<T: Injectable + ?Sized>(
        &mut self,
    ) -> Result<Option<ComponentInstancePtr<T>>, ComponentInstanceProviderError> {
        match self.primary_instance_typed::<T>() {
            Ok(instance) => Ok(Some(instance)),
            Err(ComponentInstanceProviderError::NoPrimaryInstance(type_id))
                if type_id == TypeId::of::<T>() =>
            {
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    fn instances_typed<T: Injectable + ?Sized>(
        &mut self,
    ) -> Result<Vec<ComponentInstancePtr<T>>, ComponentInstanceProviderError> {
        self.instances(TypeId::of::<T>())?
            .into_iter()
            .map(|(instance, cast)| cast_instance(instance, cast))
            .collect()
    }

    fn instance_by_name_typed<T: Injectable + ?Sized>(
        &mut self,
        name: &str,
    ) -> Result<ComponentInstancePtr<T>, ComponentInstanceProviderError> {
        let (instance, cast) = self.instance_by_name(name, TypeId::of::<T>())?;
        cast_instance(instance, cast)
    }

    fn instance_by_name_option<T: Injectable + ?Sized>(
        &mut self,
        name: &str,
    ) -> Result<Option<ComponentInstancePtr<T>>, ComponentInstanceProviderError> {
        match self.instance_by_name_typed::<T>(name) {
            Ok(instance) => Ok(Some(instance)),
            Err(ComponentInstanceProviderError::NoNamedInstance(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }
}
