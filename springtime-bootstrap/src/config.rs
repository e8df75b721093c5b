//! Bootstrap configuration is read into [BootstrapConfig], which decides how the process-wide
//! container gets [bootstrapped](crate::ioc::bootstrap).
//!
//! By default, the config is created with opinionated default values, which can then be overwritten
//! by environment variables prefixed with `SPRINGTIME_` or `springtime.json` file.
//!
//! Application code reads its own settings through a [ConfigurationSection], which is backed by the
//! same sources:
//!
//! ```json
//! {
//!     "connection_strings": {
//!         "reports": "postgres://localhost/reports"
//!     },
//!     "reports_service": {
//!         "batch_size": 100
//!     }
//! }
//! ```

use config::{Config, ConfigError, Environment, File};
use derive_more::Constructor;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::any::type_name;
use thiserror::Error;
use tracing::debug;

const CONFIG_ENV_PREFIX: &str = "SPRINGTIME";

const SECTION_ENV_SEPARATOR: &str = "__";

const CONNECTION_STRINGS_KEY: &str = "connection_strings";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "springtime.json";

/// Default marker identifying application modules to scan.
pub const DEFAULT_APPLICATION_MODULE_MARKER: &str = "springtime";

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Null or empty connection string for connection string name {0}")]
    MissingConnectionString(String),
    #[error("Error reading configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration of the bootstrap process.
#[non_exhaustive]
#[derive(Clone, Debug, Constructor)]
pub struct BootstrapConfig {
    /// Should a default tracing logger be installed when bootstrapping.
    pub install_tracing_logger: bool,
    /// Linked crates with names containing this marker are scanned for components and registries.
    pub application_module_marker: String,
    /// Should extension libraries be loaded from the extension directory.
    pub scan_extension_modules: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            application_module_marker: DEFAULT_APPLICATION_MODULE_MARKER.to_string(),
            scan_extension_modules: false,
        }
    }
}

impl From<OptionalBootstrapConfig> for BootstrapConfig {
    fn from(value: OptionalBootstrapConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            application_module_marker: value
                .application_module_marker
                .unwrap_or(default.application_module_marker),
            scan_extension_modules: value
                .scan_extension_modules
                .unwrap_or(default.scan_extension_modules),
        }
    }
}

impl BootstrapConfig {
    /// Reads the config from `springtime.json` and environment variables.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX))
            .build()
            .and_then(|config| config.try_deserialize::<OptionalBootstrapConfig>())
            .map(|config| config.into())
    }
}

#[derive(Deserialize)]
struct OptionalBootstrapConfig {
    install_tracing_logger: Option<bool>,
    application_module_marker: Option<String>,
    scan_extension_modules: Option<bool>,
}

/// A named section of application configuration, together with access to connection strings.
#[derive(Clone, Debug)]
pub struct ConfigurationSection {
    name: String,
    config: Config,
}

impl ConfigurationSection {
    pub fn new(name: &str, config: Config) -> Self {
        Self {
            name: name.to_string(),
            config,
        }
    }

    /// Creates a section named after the crate which defines `T`.
    pub fn for_type<T: ?Sized>(config: Config) -> Self {
        Self::new(crate_name::<T>(), config)
    }

    /// Loads a section from `springtime.json` and environment variables. Nested keys in variables
    /// are separated by `__`, e.g. `SPRINGTIME__CONNECTION_STRINGS__REPORTS`.
    pub fn load(name: &str) -> Result<Self, ConfigurationError> {
        let config = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX).separator(SECTION_ENV_SEPARATOR),
            )
            .build()?;

        Ok(Self::new(name, config))
    }

    /// Loads a section named after the crate which defines `T`. See [ConfigurationSection::load].
    pub fn load_for_type<T: ?Sized>() -> Result<Self, ConfigurationError> {
        Self::load(crate_name::<T>())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the connection string with given name. Absent and blank values are errors.
    pub fn connection_string(
        &self,
        connection_string_name: &str,
    ) -> Result<String, ConfigurationError> {
        let key = format!("{CONNECTION_STRINGS_KEY}.{connection_string_name}");
        match self.config.get_string(&key) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            Ok(_) | Err(ConfigError::NotFound(_)) => {
                debug!("Missing connection string: {}", connection_string_name);
                Err(ConfigurationError::MissingConnectionString(
                    connection_string_name.to_string(),
                ))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Deserializes the contents of this section.
    pub fn section<T: DeserializeOwned>(&self) -> Result<T, ConfigurationError> {
        self.config.get(&self.name).map_err(Into::into)
    }
}

fn crate_name<T: ?Sized>() -> &'static str {
    let name = type_name::<T>();
    let name = name.strip_prefix("dyn ").unwrap_or(name);
    name.split("::").next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigurationError, ConfigurationSection};
    use config::{Config, File, FileFormat};
    use serde::Deserialize;

    const CONFIG: &str = r#"{
        "connection_strings": {
            "reports": "postgres://localhost/reports",
            "blank": "   "
        },
        "springtime_bootstrap": {
            "batch_size": 100
        }
    }"#;

    #[derive(Deserialize)]
    struct ReportsConfig {
        batch_size: usize,
    }

    fn create_section() -> ConfigurationSection {
        let config = Config::builder()
            .add_source(File::from_str(CONFIG, FileFormat::Json))
            .build()
            .unwrap();

        ConfigurationSection::for_type::<ReportsConfig>(config)
    }

    #[test]
    fn should_name_section_after_crate() {
        assert_eq!(create_section().name(), "springtime_bootstrap");
    }

    #[test]
    fn should_read_connection_string() {
        assert_eq!(
            create_section().connection_string("reports").unwrap(),
            "postgres://localhost/reports"
        );
    }

    #[test]
    fn should_reject_missing_connection_string() {
        let error = create_section().connection_string("audit").unwrap_err();

        assert!(matches!(
            error,
            ConfigurationError::MissingConnectionString(ref name) if name == "audit"
        ));
        assert_eq!(
            error.to_string(),
            "Null or empty connection string for connection string name audit"
        );
    }

    #[test]
    fn should_reject_blank_connection_string() {
        assert!(matches!(
            create_section().connection_string("blank"),
            Err(ConfigurationError::MissingConnectionString(_))
        ));
    }

    #[test]
    fn should_deserialize_section() {
        let config = create_section().section::<ReportsConfig>().unwrap();
        assert_eq!(config.batch_size, 100);
    }
}
