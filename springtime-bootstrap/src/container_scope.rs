//! [ContainerScope] provides a container to code which cannot take part in dependency injection,
//! e.g. callbacks invoked by foreign libraries. It is meant for short-lived operations:
//!
//! ```no_run
//! use springtime_bootstrap::container_scope::ContainerScope;
//! # struct ReportGenerator;
//! # impl springtime_container::component::Component for ReportGenerator {
//! #     fn create(
//! #         _instance_provider: &mut dyn springtime_container::instance_provider::ComponentInstanceProvider,
//! #     ) -> Result<Self, springtime_container::instance_provider::ComponentInstanceProviderError> {
//! #         Ok(Self)
//! #     }
//! # }
//!
//! let scope = ContainerScope::new().unwrap();
//! let generator = scope.container().get_instance::<ReportGenerator>().unwrap();
//! ```
//!
//! The first scope created in a [call context](crate::call_context) creates a new
//! [disposable container](crate::ioc::disposable_container), owns it and publishes it in the call
//! context. Scopes created later in the same context, e.g. deeper in the call stack, enroll in the
//! published container without owning it. Only the owner disposes the container and frees the slot.

use crate::call_context;
use crate::ioc::{BootstrapError, Ioc};
use once_cell::sync::Lazy;
use springtime_container::container::Container;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

static CURRENT_CONTAINER_KEY: Lazy<String> =
    Lazy::new(|| format!("Container-{}", Uuid::new_v4().simple()));

/// Call context slot name used by scopes created with [ContainerScope::new].
pub fn current_container_key() -> &'static str {
    &CURRENT_CONTAINER_KEY
}

/// Guard giving access to a container associated with the current call context. Disposes the
/// container when dropped, if it owns it.
pub struct ContainerScope {
    key: String,
    container: Container,
    owner: bool,
    disposed: bool,
}

impl ContainerScope {
    /// Creates a scope using the default slot and the [global](Ioc::global) holder.
    pub fn new() -> Result<Self, BootstrapError> {
        Self::with_key(current_container_key())
    }

    /// Creates a scope using given slot and the [global](Ioc::global) holder.
    pub fn with_key(key: &str) -> Result<Self, BootstrapError> {
        Self::with_ioc(Ioc::global(), key)
    }

    /// Creates a scope using given slot and holder.
    pub fn with_ioc(ioc: &Ioc, key: &str) -> Result<Self, BootstrapError> {
        let existing = call_context::logical_get_data::<Container>(key)
            .filter(|container| !container.is_disposed());

        if let Some(container) = existing {
            debug!("Enrolling in container scope {}.", key);

            return Ok(Self {
                key: key.to_string(),
                container: Container::clone(&container),
                owner: false,
                disposed: false,
            });
        }

        let container = ioc.disposable_container()?;
        call_context::logical_set_data(key, Arc::new(container.clone()));

        debug!("Created container scope {}.", key);

        Ok(Self {
            key: key.to_string(),
            container,
            owner: true,
            disposed: false,
        })
    }

    #[inline]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Checks if the container existed in the call context when this scope was created.
    #[inline]
    pub fn enrolled(&self) -> bool {
        !self.owner
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Disposes the container and frees the call context slot, if this scope owns the container.
    /// A slot taken over by a newer owner is left intact. Subsequent calls do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }

        if self.owner {
            if call_context::logical_get_data::<Container>(&self.key)
                .map(|published| published.same_container(&self.container))
                .unwrap_or(false)
            {
                call_context::free_named_data_slot(&self.key);
            }

            self.container.dispose();

            debug!("Disposed container scope {}.", self.key);
        }

        self.disposed = true;
    }
}

impl Drop for ContainerScope {
    fn drop(&mut self) {
        self.dispose();
    }
}
