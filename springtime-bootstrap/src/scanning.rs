//! Naming and directory conventions for selecting modules to scan.
//!
//! * Application modules are linked crates with names containing a marker, e.g. `springtime`.
//! * Extension modules are dynamic libraries named `*_extension` or `*_extensions` (with the
//! platform library suffix), placed in the extension directory: `bin/ext` or `ext` next to the
//! running executable.

use crate::convention::CustomTypePluginConvention;
use springtime_container::component::Injectable;
use springtime_container::scanning::{ModuleInfo, Scanner};
use std::env;
use std::env::consts::DLL_SUFFIX;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const EXTENSION_MODULE_SUFFIXES: [&str; 2] = ["_extension", "_extensions"];

const EXTENSION_BIN_PATH: [&str; 2] = ["bin", "ext"];

const EXTENSION_DIR_NAME: &str = "ext";

/// Checks if the module is an application module identified by given marker.
pub fn is_application_module(module: &ModuleInfo, marker: &str) -> bool {
    module.name.to_lowercase().contains(&marker.to_lowercase()) && !is_extension_module(module)
}

/// Checks if the module is an extension library located in an extension directory.
pub fn is_extension_module(module: &ModuleInfo) -> bool {
    let name = module.name.to_lowercase();

    EXTENSION_MODULE_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(&format!("{suffix}{DLL_SUFFIX}")))
        && module
            .location
            .to_lowercase()
            .contains(&format!("/{EXTENSION_DIR_NAME}/"))
}

/// Returns the extension directory for given base directory, if it exists.
pub fn extension_dir(base: &Path) -> Option<PathBuf> {
    let bin_dir = EXTENSION_BIN_PATH
        .iter()
        .fold(base.to_path_buf(), |path, part| path.join(part));

    // depending on the build layout, extensions end up in either location
    [bin_dir, base.join(EXTENSION_DIR_NAME)]
        .into_iter()
        .find(|dir| dir.is_dir())
}

/// Returns the directory containing the running executable.
pub fn application_base_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(Path::to_path_buf))
}

/// Scanning conventions for a [Scanner].
pub trait ScannerExt {
    /// Scans linked application modules identified by given marker.
    fn application_modules(&mut self, marker: &str) -> &mut Self;

    /// Scans extension modules relative to the [application base dir](application_base_dir).
    fn extension_modules(&mut self) -> &mut Self;

    /// Scans extension modules in the extension directory of given base directory. Nothing is
    /// scanned if the directory does not exist.
    fn extension_modules_from(&mut self, base: &Path) -> &mut Self;

    /// Applies a [CustomTypePluginConvention] for closed plugin type `T`.
    fn with_plugin_convention<T: Injectable + ?Sized>(&mut self) -> &mut Self;
}

impl ScannerExt for Scanner {
    fn application_modules(&mut self, marker: &str) -> &mut Self {
        let marker = marker.to_string();
        self.modules_matching(move |module| is_application_module(module, &marker))
    }

    fn extension_modules(&mut self) -> &mut Self {
        match application_base_dir() {
            Some(base) => self.extension_modules_from(&base),
            None => {
                warn!("Cannot determine application base directory - skipping extension modules.");
                self
            }
        }
    }

    fn extension_modules_from(&mut self, base: &Path) -> &mut Self {
        match extension_dir(base) {
            Some(dir) => {
                debug!("Scanning extension modules in {}.", dir.display());
                self.modules_from_path(dir, is_extension_module)
            }
            None => {
                debug!("No extension directory found in {}.", base.display());
                self
            }
        }
    }

    fn with_plugin_convention<T: Injectable + ?Sized>(&mut self) -> &mut Self {
        self.with(CustomTypePluginConvention::for_type::<T>())
    }
}

#[cfg(test)]
mod tests {
    use crate::scanning::{
        extension_dir, is_application_module, is_extension_module, ScannerExt,
    };
    use springtime_container::component::Component;
    use springtime_container::container::Container;
    use springtime_container::instance_provider::{
        ComponentInstanceProvider, ComponentInstanceProviderError,
    };
    use springtime_container::scanning::{ModuleInfo, Scanner};
    use springtime_container::{component_alias, injectable, scan_component, ContainerError};
    use std::env::consts::DLL_SUFFIX;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    trait Exporter {
        fn format(&self) -> &'static str;
    }

    injectable!(dyn Exporter + Send + Sync);

    struct CsvExporter;

    impl Exporter for CsvExporter {
        fn format(&self) -> &'static str {
            "csv"
        }
    }

    impl Component for CsvExporter {
        fn create(
            _instance_provider: &mut dyn ComponentInstanceProvider,
        ) -> Result<Self, ComponentInstanceProviderError> {
            Ok(Self)
        }
    }

    component_alias!(dyn Exporter + Send + Sync => CsvExporter);
    scan_component!(CsvExporter => dyn Exporter + Send + Sync);

    fn library(path: &str) -> ModuleInfo {
        ModuleInfo::library(Path::new(&format!("{path}{DLL_SUFFIX}")))
    }

    #[test]
    fn should_recognize_extension_modules() {
        assert!(is_extension_module(&library("/opt/app/bin/ext/libreports_extension")));
        assert!(is_extension_module(&library("/opt/app/ext/libReports_Extensions")));
        assert!(!is_extension_module(&library("/opt/app/libreports_extension")));
        assert!(!is_extension_module(&library("/opt/app/ext/libreports")));
        assert!(!is_extension_module(&ModuleInfo::library(Path::new(
            "/opt/app/ext/libreports_extension.txt"
        ))));
    }

    #[test]
    fn should_recognize_application_modules() {
        assert!(is_application_module(
            &ModuleInfo::linked("springtime_reports::jobs", "src/jobs.rs"),
            "Springtime"
        ));
        assert!(!is_application_module(
            &ModuleInfo::linked("serde::de", "src/de.rs"),
            "springtime"
        ));
        assert!(!is_application_module(
            &library("/opt/app/ext/libspringtime_extension"),
            "springtime"
        ));
    }

    #[test]
    fn should_prefer_bin_extension_dir() {
        let base = tempdir().unwrap();
        assert!(extension_dir(base.path()).is_none());

        fs::create_dir_all(base.path().join("ext")).unwrap();
        assert_eq!(extension_dir(base.path()), Some(base.path().join("ext")));

        fs::create_dir_all(base.path().join("bin").join("ext")).unwrap();
        assert_eq!(
            extension_dir(base.path()),
            Some(base.path().join("bin").join("ext"))
        );
    }

    #[test]
    fn should_skip_missing_extension_dir() {
        let base = tempdir().unwrap();

        let mut scanner = Scanner::new();
        scanner.extension_modules_from(base.path());

        assert!(scanner.scan().unwrap().types.is_empty());
    }

    #[test]
    fn should_only_load_extension_modules() {
        let base = tempdir().unwrap();
        let dir = base.path().join("ext");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("libreports{DLL_SUFFIX}")), b"not a library").unwrap();

        let mut scanner = Scanner::new();
        scanner.extension_modules_from(base.path());
        assert!(scanner.scan().unwrap().types.is_empty());

        fs::write(
            dir.join(format!("libreports_extension{DLL_SUFFIX}")),
            b"not a library",
        )
        .unwrap();
        assert!(matches!(
            scanner.scan(),
            Err(ContainerError::ModuleLoad { .. })
        ));
    }

    #[test]
    fn should_register_application_plugins() {
        let container = Container::configure(|registry| {
            registry.scan(|scanner| {
                scanner
                    .application_modules("springtime_bootstrap")
                    .with_plugin_convention::<dyn Exporter + Send + Sync>();
            });
        })
        .unwrap();

        let exporters = container
            .get_all_instances::<dyn Exporter + Send + Sync>()
            .unwrap();

        assert_eq!(exporters.len(), 1);
        assert_eq!(exporters[0].format(), "csv");
    }
}
