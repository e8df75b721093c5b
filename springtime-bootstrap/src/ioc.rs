//! Process-wide container holder. The application configures the root [Container] once at
//! startup, and then obtains the [application container](application_container) or short-lived
//! [disposable containers](disposable_container) from anywhere in the process.
//!
//! The application container is the [EXTENSION_PROFILE_NAME] profile of the root container, so
//! registrations placed in that profile (typically by extension modules) override the defaults.
//!
//! ```no_run
//! use springtime_bootstrap::config::BootstrapConfig;
//! use springtime_bootstrap::ioc;
//!
//! let config = BootstrapConfig::init_from_environment().unwrap();
//! ioc::bootstrap(&config).unwrap();
//! ioc::assert_configuration_is_valid().unwrap();
//! ```

use crate::config::{BootstrapConfig, ConfigurationError};
use crate::default_registry::DefaultRegistry;
use crate::logging::install_tracing_logger;
use config::ConfigError;
use once_cell::sync::Lazy;
use springtime_container::container::Container;
use springtime_container::registry::Registry;
use springtime_container::ContainerError;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

/// Name of the root container profile used as the application container.
pub const EXTENSION_PROFILE_NAME: &str = "extensions";

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("A root container has already been registered. Call reset() to dispose the existing container before registering another to ensure proper cleanup and initialization.")]
    AlreadyConfigured,
    #[error("The root container has not been configured.")]
    NotConfigured,
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl From<ConfigError> for BootstrapError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(error.into())
    }
}

#[derive(Default)]
struct IocState {
    root: Option<Container>,
    application: Option<Container>,
}

/// Holder of a root container and its application container. Most code uses the
/// [global](Ioc::global) instance through the functions in this module.
#[derive(Default)]
pub struct Ioc {
    state: Mutex<IocState>,
}

static GLOBAL: Lazy<Ioc> = Lazy::new(Ioc::default);

impl Ioc {
    pub fn new() -> Self {
        Default::default()
    }

    /// The process-wide instance.
    #[inline]
    pub fn global() -> &'static Ioc {
        &GLOBAL
    }

    fn state(&self) -> MutexGuard<'_, IocState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks if a root container is registered.
    pub fn is_configured(&self) -> bool {
        self.state().root.is_some()
    }

    /// Builds a root container using given registry configuration and registers it.
    pub fn configure<F: FnOnce(&mut Registry)>(&self, configure: F) -> Result<(), BootstrapError> {
        // fail before potentially expensive scanning
        if self.is_configured() {
            return Err(BootstrapError::AlreadyConfigured);
        }

        self.configure_with_container(Container::configure(configure)?)
    }

    /// Registers an existing container as the root container.
    pub fn configure_with_container(&self, container: Container) -> Result<(), BootstrapError> {
        let mut state = self.state();
        if state.root.is_some() {
            return Err(BootstrapError::AlreadyConfigured);
        }

        let application = container.get_profile(EXTENSION_PROFILE_NAME)?;

        state.root = Some(container);
        state.application = Some(application);

        info!("Configured root container.");
        Ok(())
    }

    /// Returns the application container.
    pub fn application_container(&self) -> Result<Container, BootstrapError> {
        self.state()
            .application
            .clone()
            .ok_or(BootstrapError::NotConfigured)
    }

    /// Returns a new nested container of the application container. The caller is responsible for
    /// [disposing](Container::dispose) it.
    pub fn disposable_container(&self) -> Result<Container, BootstrapError> {
        self.application_container()
            .map(|container| container.nested_container())
    }

    /// Verifies that all components registered in the application container can be created.
    pub fn assert_configuration_is_valid(&self) -> Result<(), BootstrapError> {
        let container = self.disposable_container()?;

        debug!("{}", container.what_do_i_have());

        let result = container.assert_configuration_is_valid();
        container.dispose();

        result.map_err(Into::into)
    }

    /// Disposes and forgets the root container, which allows configuring a new one.
    pub fn reset(&self) {
        let (root, _) = {
            let mut state = self.state();
            (state.root.take(), state.application.take())
        };

        if let Some(root) = root {
            root.dispose();
            info!("Root container has been reset.");
        }
    }

    /// Installs the tracing logger, if requested, and configures the root container using a
    /// [DefaultRegistry].
    pub fn bootstrap(&self, config: &BootstrapConfig) -> Result<(), BootstrapError> {
        if config.install_tracing_logger {
            install_tracing_logger();
        }

        info!("Bootstrapping root container...");

        let registry = DefaultRegistry::new(config);
        self.configure(|root| {
            root.include(registry.into());
        })
    }
}

/// Configures the [global](Ioc::global) root container. See [Ioc::configure].
pub fn configure<F: FnOnce(&mut Registry)>(configure: F) -> Result<(), BootstrapError> {
    Ioc::global().configure(configure)
}

/// Registers the [global](Ioc::global) root container. See [Ioc::configure_with_container].
pub fn configure_with_container(container: Container) -> Result<(), BootstrapError> {
    Ioc::global().configure_with_container(container)
}

/// See [Ioc::is_configured].
pub fn is_configured() -> bool {
    Ioc::global().is_configured()
}

/// See [Ioc::application_container].
pub fn application_container() -> Result<Container, BootstrapError> {
    Ioc::global().application_container()
}

/// See [Ioc::disposable_container].
pub fn disposable_container() -> Result<Container, BootstrapError> {
    Ioc::global().disposable_container()
}

/// See [Ioc::assert_configuration_is_valid].
pub fn assert_configuration_is_valid() -> Result<(), BootstrapError> {
    Ioc::global().assert_configuration_is_valid()
}

/// See [Ioc::reset].
pub fn reset() {
    Ioc::global().reset()
}

/// See [Ioc::bootstrap].
pub fn bootstrap(config: &BootstrapConfig) -> Result<(), BootstrapError> {
    Ioc::global().bootstrap(config)
}

/// Reads [BootstrapConfig] from the environment and bootstraps the global root container.
pub fn bootstrap_from_environment() -> Result<(), BootstrapError> {
    let config = BootstrapConfig::init_from_environment()?;
    bootstrap(&config)
}

#[cfg(test)]
mod tests {
    use crate::ioc::{BootstrapError, Ioc};
    use springtime_container::component::Component;
    use springtime_container::container::Container;
    use springtime_container::instance_provider::{
        ComponentInstanceProvider, ComponentInstanceProviderError, ComponentInstancePtr,
        TypedComponentInstanceProvider,
    };
    use springtime_container::{component_alias, injectable};

    trait Notifier {
        fn channel(&self) -> &'static str;
    }

    injectable!(dyn Notifier + Send + Sync);

    struct EmailNotifier;

    impl Notifier for EmailNotifier {
        fn channel(&self) -> &'static str {
            "email"
        }
    }

    impl Component for EmailNotifier {
        fn create(
            _instance_provider: &mut dyn ComponentInstanceProvider,
        ) -> Result<Self, ComponentInstanceProviderError> {
            Ok(Self)
        }
    }

    component_alias!(dyn Notifier + Send + Sync => EmailNotifier);

    struct SmsNotifier;

    impl Notifier for SmsNotifier {
        fn channel(&self) -> &'static str {
            "sms"
        }
    }

    impl Component for SmsNotifier {
        fn create(
            _instance_provider: &mut dyn ComponentInstanceProvider,
        ) -> Result<Self, ComponentInstanceProviderError> {
            Ok(Self)
        }
    }

    component_alias!(dyn Notifier + Send + Sync => SmsNotifier);

    struct Broken {
        _notifier: ComponentInstancePtr<SmsNotifier>,
    }

    impl Component for Broken {
        fn create(
            instance_provider: &mut dyn ComponentInstanceProvider,
        ) -> Result<Self, ComponentInstanceProviderError> {
            Ok(Self {
                _notifier: instance_provider.primary_instance_typed()?,
            })
        }
    }

    fn create_ioc() -> Ioc {
        let ioc = Ioc::new();
        ioc.configure(|registry| {
            registry
                .register::<EmailNotifier>()
                .alias::<dyn Notifier + Send + Sync>();
            registry.profile(super::EXTENSION_PROFILE_NAME, |profile| {
                profile
                    .register::<SmsNotifier>()
                    .alias::<dyn Notifier + Send + Sync>();
            });
        })
        .unwrap();

        ioc
    }

    #[test]
    fn should_refuse_second_configuration() {
        let ioc = create_ioc();

        assert!(matches!(
            ioc.configure(|_| {}),
            Err(BootstrapError::AlreadyConfigured)
        ));
        assert!(matches!(
            ioc.configure_with_container(Container::configure(|_| {}).unwrap()),
            Err(BootstrapError::AlreadyConfigured)
        ));
    }

    #[test]
    fn should_allow_configuration_after_reset() {
        let ioc = create_ioc();
        let application = ioc.application_container().unwrap();

        ioc.reset();

        assert!(!ioc.is_configured());
        assert!(application.is_disposed());
        assert!(matches!(
            ioc.application_container(),
            Err(BootstrapError::NotConfigured)
        ));
        assert!(ioc.configure(|_| {}).is_ok());
    }

    #[test]
    fn should_use_extension_profile_as_application_container() {
        let ioc = create_ioc();

        let notifier = ioc
            .application_container()
            .unwrap()
            .get_instance::<dyn Notifier + Send + Sync>()
            .unwrap();
        assert_eq!(notifier.channel(), "sms");
    }

    #[test]
    fn should_create_disposable_containers() {
        let ioc = create_ioc();

        let first = ioc.disposable_container().unwrap();
        let second = ioc.disposable_container().unwrap();
        assert!(!first.same_container(&second));

        first.dispose();
        assert!(first.is_disposed());
        assert!(!second.is_disposed());
    }

    #[test]
    fn should_require_configuration() {
        let ioc = Ioc::new();

        assert!(matches!(
            ioc.disposable_container(),
            Err(BootstrapError::NotConfigured)
        ));
        assert!(matches!(
            ioc.assert_configuration_is_valid(),
            Err(BootstrapError::NotConfigured)
        ));
    }

    #[test]
    fn should_validate_application_container() {
        let ioc = create_ioc();
        assert!(ioc.assert_configuration_is_valid().is_ok());

        let ioc = Ioc::new();
        ioc.configure(|registry| {
            registry.register::<Broken>();
        })
        .unwrap();

        assert!(matches!(
            ioc.assert_configuration_is_valid(),
            Err(BootstrapError::Container(_))
        ));
    }
}
