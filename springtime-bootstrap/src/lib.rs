//! Bootstrapping layer for [springtime_container].
//!
//! Applications typically configure a process-wide root container once during startup, either
//! explicitly or by [bootstrapping](ioc::bootstrap) it from registries found by scanning
//! application and extension modules. Afterwards, code outside of the dependency graph can get a
//! container from the [ioc] holder or from a [ContainerScope](container_scope::ContainerScope)
//! bound to the current [call context](call_context).
//!
//! Supporting infrastructure includes [plugin conventions](convention), [module selection
//! conventions](scanning) and [configuration](config) access.

pub mod call_context;
pub mod config;
pub mod container_scope;
pub mod convention;
pub mod default_registry;
pub mod ioc;
pub mod logging;
pub mod scanning;
