use crate::config::BootstrapConfig;
use crate::scanning::ScannerExt;
use derive_more::{Deref, DerefMut};
use springtime_container::registry::Registry;

/// Registry used when [bootstrapping](crate::ioc::bootstrap): includes registries published by
/// application modules and, if enabled, by extension modules.
#[derive(Deref, DerefMut)]
pub struct DefaultRegistry(Registry);

impl DefaultRegistry {
    pub fn new(config: &BootstrapConfig) -> Self {
        let mut registry = Registry::new();

        registry.scan(|scanner| {
            scanner
                .application_modules(&config.application_module_marker)
                .look_for_registries();
        });

        if config.scan_extension_modules {
            registry.scan(|scanner| {
                scanner.extension_modules().look_for_registries();
            });
        }

        Self(registry)
    }
}

impl From<DefaultRegistry> for Registry {
    fn from(value: DefaultRegistry) -> Self {
        value.0
    }
}
