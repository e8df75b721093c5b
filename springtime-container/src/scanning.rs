//! Module scanning discovers components and [Registries](Registry) without registering each one by
//! hand. A module is a compilation unit: either a crate linked into the current binary or a
//! dynamic library found on disk.
//!
//! Linked crates publish their components with [scan_component!](crate::scan_component) and their
//! registries with [scan_registry!](crate::scan_registry):
//!
//! ```
//! use springtime_container::component::Component;
//! use springtime_container::instance_provider::{
//!     ComponentInstanceProvider, ComponentInstanceProviderError,
//! };
//! use springtime_container::registry::Registry;
//! use springtime_container::{component_alias, injectable, scan_component, scan_registry};
//!
//! trait Job {}
//!
//! injectable!(dyn Job + Send + Sync);
//!
//! struct CleanupJob;
//!
//! impl Job for CleanupJob {}
//!
//! impl Component for CleanupJob {
//!     fn create(
//!         _instance_provider: &mut dyn ComponentInstanceProvider,
//!     ) -> Result<Self, ComponentInstanceProviderError> {
//!         Ok(Self)
//!     }
//! }
//!
//! component_alias!(dyn Job + Send + Sync => CleanupJob);
//! scan_component!(CleanupJob => dyn Job + Send + Sync);
//!
//! fn jobs_registry() -> Registry {
//!     let mut registry = Registry::new();
//!     registry.register::<CleanupJob>().singleton();
//!     registry
//! }
//!
//! scan_registry!(jobs_registry);
//! ```
//!
//! Dynamic libraries are expected to be built from crates using
//! [export_module!](crate::export_module), which exposes everything the library publishes. Loading
//! libraries requires them to be built with the same compiler and dependency versions as the host.
//!
//! A [Scanner] selects modules and applies [RegistrationConvention]s to the [TypeSet] of scanned
//! components.

use crate::component::{Component, ComponentDowncast};
use crate::component_registry::{alias_cast, component_constructor, Constructor};
use crate::error::ContainerError;
use crate::instance_provider::CastFunction;
use crate::registry::Registry;
use derivative::Derivative;
use fxhash::FxHashSet;
use libloading::Library;
use std::any::{type_name, TypeId};
use std::env::consts::DLL_SUFFIX;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Name of the function exported by dynamic library modules.
pub const MODULE_EXPORT_SYMBOL: &str = "springtime_module";

pub type ModuleFilter = Box<dyn Fn(&ModuleInfo) -> bool + Send + Sync>;

pub type RegistrationConventionPtr = Box<dyn RegistrationConvention + Send + Sync>;

/// Kind of scanned module.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ModuleKind {
    /// A crate linked into the running binary.
    Linked,
    /// A dynamic library loaded at runtime.
    Library,
}

/// Identifies a scanned module.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ModuleInfo {
    /// Crate name for linked modules, file name for libraries.
    pub name: String,
    /// Source file for linked modules, library path for libraries. Always uses `/` as separator.
    pub location: String,
    pub kind: ModuleKind,
}

impl ModuleInfo {
    /// Creates info for a linked crate based on `module_path!()` and `file!()` of an item.
    pub fn linked(module_path: &str, location: &str) -> Self {
        Self {
            name: module_path
                .split("::")
                .next()
                .unwrap_or(module_path)
                .to_string(),
            location: normalize_location(location),
            kind: ModuleKind::Linked,
        }
    }

    /// Creates info for a dynamic library file.
    pub fn library(path: &Path) -> Self {
        Self {
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            location: normalize_location(&path.to_string_lossy()),
            kind: ModuleKind::Library,
        }
    }
}

impl Display for ModuleInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.location)
    }
}

fn normalize_location(location: &str) -> String {
    location.replace('\\', "/")
}

/// A type which a scanned component can be requested as.
#[derive(Derivative, Clone, Copy)]
#[derivative(Debug)]
pub struct PluginTypeInfo {
    pub type_id: TypeId,
    pub type_name: &'static str,
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

impl PluginTypeInfo {
    /// Info for `Source` being an alias of component `Target`.
    pub fn of<Source: ComponentDowncast<Target> + ?Sized, Target: Component>() -> Self {
        Self {
            type_id: TypeId::of::<Source>(),
            type_name: type_name::<Source>(),
            cast: alias_cast::<Source, Target>,
        }
    }

    /// The generic family of this type, i.e. its path without generic arguments and auto traits,
    /// e.g. `app::Handler` for `dyn app::Handler<app::Event> + Send + Sync`.
    pub fn generic_family(&self) -> &'static str {
        generic_family(self.type_name)
    }
}

/// Returns the generic family of a type name. See [PluginTypeInfo::generic_family].
pub fn generic_family(type_name: &str) -> &str {
    let name = type_name.strip_prefix("dyn ").unwrap_or(type_name);
    let end = name.find(['<', ' ']).unwrap_or(name.len());
    &name[..end]
}

/// A component discovered by scanning.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ScannedType {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub module: ModuleInfo,
    #[derivative(Debug = "ignore")]
    pub constructor: Constructor,
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
    /// Alias types the component can be cast to.
    pub plugin_types: Vec<PluginTypeInfo>,
}

impl ScannedType {
    /// Creates a scanned type for component `C` without any aliases.
    pub fn of<C: Component>(module: ModuleInfo) -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: type_name::<C>(),
            module,
            constructor: component_constructor::<C>(),
            cast: alias_cast::<C, C>,
            plugin_types: vec![],
        }
    }

    /// Adds `Source` as a type the component can be cast to.
    pub fn plugin<Source: ComponentDowncast<Target> + ?Sized, Target: Component>(
        mut self,
    ) -> Self {
        debug_assert_eq!(self.type_id, TypeId::of::<Target>());
        self.plugin_types.push(PluginTypeInfo::of::<Source, Target>());
        self
    }

    /// Returns this component described as a plugin type of itself.
    pub fn as_plugin_type(&self) -> PluginTypeInfo {
        PluginTypeInfo {
            type_id: self.type_id,
            type_name: self.type_name,
            cast: self.cast,
        }
    }

    /// Checks if the component can be requested as the given type.
    pub fn can_be_cast_to(&self, type_id: TypeId) -> bool {
        self.plugin_type(type_id).is_some()
    }

    /// Returns plugin type info for given type, if the component can be cast to it.
    pub fn plugin_type(&self, type_id: TypeId) -> Option<PluginTypeInfo> {
        if type_id == self.type_id {
            return Some(self.as_plugin_type());
        }

        self.plugin_types
            .iter()
            .find(|plugin_type| plugin_type.type_id == type_id)
            .copied()
    }

    /// Returns the first plugin type belonging to given generic family.
    pub fn first_plugin_type_in_family(&self, family: &str) -> Option<PluginTypeInfo> {
        self.plugin_types
            .iter()
            .find(|plugin_type| plugin_type.generic_family() == family)
            .copied()
    }
}

/// Set of types discovered by a [Scanner].
#[derive(Clone, Debug, Default)]
pub struct TypeSet {
    types: Vec<ScannedType>,
}

impl TypeSet {
    /// Returns all found types.
    pub fn find_types(&self) -> impl Iterator<Item = &ScannedType> {
        self.types.iter()
    }

    /// Returns the modules which contributed types.
    pub fn modules(&self) -> FxHashSet<&ModuleInfo> {
        self.types.iter().map(|scanned| &scanned.module).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn insert(&mut self, scanned: ScannedType) {
        if !self
            .types
            .iter()
            .any(|existing| existing.type_id == scanned.type_id)
        {
            self.types.push(scanned);
        }
    }
}

impl FromIterator<ScannedType> for TypeSet {
    fn from_iter<T: IntoIterator<Item = ScannedType>>(iter: T) -> Self {
        let mut set = TypeSet::default();
        for scanned in iter {
            set.insert(scanned);
        }

        set
    }
}

/// Convention registering scanned types in a [Registry].
pub trait RegistrationConvention {
    fn scan_types(&self, types: &TypeSet, registry: &mut Registry);
}

/// Registry factory found by scanning.
#[derive(Clone, Debug)]
pub struct ScannedRegistry {
    pub module: ModuleInfo,
    pub name: &'static str,
    pub create: fn() -> Registry,
}

/// Result of scanning modules.
#[derive(Default)]
pub struct ScanResult {
    pub types: TypeSet,
    pub registries: Vec<ScannedRegistry>,
    pub(crate) libraries: Vec<Arc<Library>>,
}

enum ModuleSource {
    Linked(ModuleFilter),
    Path { path: PathBuf, filter: ModuleFilter },
}

/// Selects modules to scan and conventions to apply to found types.
#[derive(Default)]
pub struct Scanner {
    sources: Vec<ModuleSource>,
    conventions: Vec<RegistrationConventionPtr>,
    look_for_registries: bool,
}

impl Scanner {
    pub fn new() -> Self {
        Default::default()
    }

    /// Includes linked modules accepted by given filter.
    pub fn modules_matching<F: Fn(&ModuleInfo) -> bool + Send + Sync + 'static>(
        &mut self,
        filter: F,
    ) -> &mut Self {
        self.sources.push(ModuleSource::Linked(Box::new(filter)));
        self
    }

    /// Includes the linked crate with given name.
    pub fn module(&mut self, name: &str) -> &mut Self {
        let name = name.to_string();
        self.modules_matching(move |module| module.name == name)
    }

    /// Includes dynamic libraries from given directory. The filter is applied before loading.
    pub fn modules_from_path<
        P: Into<PathBuf>,
        F: Fn(&ModuleInfo) -> bool + Send + Sync + 'static,
    >(
        &mut self,
        path: P,
        filter: F,
    ) -> &mut Self {
        self.sources.push(ModuleSource::Path {
            path: path.into(),
            filter: Box::new(filter),
        });
        self
    }

    /// Includes registries published by scanned modules.
    pub fn look_for_registries(&mut self) -> &mut Self {
        self.look_for_registries = true;
        self
    }

    /// Applies given convention to scanned types.
    pub fn with<C: RegistrationConvention + Send + Sync + 'static>(
        &mut self,
        convention: C,
    ) -> &mut Self {
        self.conventions.push(Box::new(convention));
        self
    }

    #[inline]
    pub fn is_looking_for_registries(&self) -> bool {
        self.look_for_registries
    }

    #[inline]
    pub fn conventions(&self) -> &[RegistrationConventionPtr] {
        &self.conventions
    }

    /// Scans selected modules.
    pub fn scan(&self) -> Result<ScanResult, ContainerError> {
        let mut result = ScanResult::default();

        for source in &self.sources {
            match source {
                ModuleSource::Linked(filter) => {
                    scan_linked(filter, &mut result);
                }
                ModuleSource::Path { path, filter } => {
                    scan_path(path, filter, &mut result)?;
                }
            }
        }

        info!(
            "Scanned {} modules with {} types and {} registries.",
            result.types.modules().len(),
            result.types.len(),
            result.registries.len()
        );

        Ok(result)
    }
}

fn scan_linked(filter: &ModuleFilter, result: &mut ScanResult) {
    for registrar in inventory::iter::<internal::TypeRegistrar> {
        let module = ModuleInfo::linked(registrar.module_path, registrar.location);
        if filter(&module) {
            result.types.insert((registrar.register)(module));
        }
    }

    for registrar in inventory::iter::<internal::RegistryRegistrar> {
        let module = ModuleInfo::linked(registrar.module_path, registrar.location);
        if filter(&module) {
            result.registries.push(registrar.to_scanned(module));
        }
    }
}

fn scan_path(
    path: &Path,
    filter: &ModuleFilter,
    result: &mut ScanResult,
) -> Result<(), ContainerError> {
    let entries = fs::read_dir(path).map_err(|error| ContainerError::ModuleLoad {
        path: path.to_string_lossy().into_owned(),
        message: error.to_string(),
    })?;

    for entry in entries.filter_map(Result::ok) {
        let library_path = entry.path();
        if !library_path.is_file()
            || !library_path
                .file_name()
                .map(|name| name.to_string_lossy().ends_with(DLL_SUFFIX))
                .unwrap_or(false)
        {
            continue;
        }

        let module = ModuleInfo::library(&library_path);
        if !filter(&module) {
            debug!("Skipping library module {}.", module);
            continue;
        }

        info!("Loading library module {}.", module);

        let (library, exports) = load_library(&library_path)?;
        for registrar in exports.types {
            result.types.insert((registrar.register)(module.clone()));
        }

        for registrar in exports.registries {
            result.registries.push(registrar.to_scanned(module.clone()));
        }

        result.libraries.push(library);
    }

    Ok(())
}

fn load_library(path: &Path) -> Result<(Arc<Library>, ModuleExports), ContainerError> {
    let load_error = |error: libloading::Error| ContainerError::ModuleLoad {
        path: path.to_string_lossy().into_owned(),
        message: error.to_string(),
    };

    // SAFETY: module libraries are trusted code built against this crate; their initialization
    // routines are expected to be free of side effects
    let library = unsafe { Library::new(path) }.map_err(load_error)?;

    let exports = {
        // SAFETY: the symbol is generated by export_module! with this exact signature
        let export = unsafe {
            library.get::<fn() -> ModuleExports>(MODULE_EXPORT_SYMBOL.as_bytes())
        }
        .map_err(load_error)?;

        (*export)()
    };

    Ok((Arc::new(library), exports))
}

/// Everything published by a dynamic library module. Created by
/// [export_module!](crate::export_module).
pub struct ModuleExports {
    pub types: Vec<&'static internal::TypeRegistrar>,
    pub registries: Vec<&'static internal::RegistryRegistrar>,
}

impl ModuleExports {
    /// Collects everything published in the current binary.
    pub fn collect() -> Self {
        Self {
            types: inventory::iter::<internal::TypeRegistrar>
                .into_iter()
                .collect(),
            registries: inventory::iter::<internal::RegistryRegistrar>
                .into_iter()
                .collect(),
        }
    }
}

/// Publishes a component for scanning, optionally with alias types it can be requested as:
/// `scan_component!(Type => dyn Trait1 + Send + Sync, dyn Trait2 + Send + Sync)`. Each alias needs
/// a corresponding [component_alias!](crate::component_alias).
#[macro_export]
macro_rules! scan_component {
    ($component:ty $(=> $($plugin:ty),+ $(,)?)?) => {
        const _: () = {
            fn register(
                module: $crate::scanning::ModuleInfo,
            ) -> $crate::scanning::ScannedType {
                $crate::scanning::ScannedType::of::<$component>(module)
                    $($(.plugin::<$plugin, $component>())+)?
            }

            $crate::scanning::internal::submit! {
                $crate::scanning::internal::TypeRegistrar {
                    module_path: module_path!(),
                    location: file!(),
                    register,
                }
            }
        };
    };
}

/// Publishes a function returning a [Registry] for scanning with
/// [Scanner::look_for_registries].
#[macro_export]
macro_rules! scan_registry {
    ($factory:path) => {
        $crate::scanning::internal::submit! {
            $crate::scanning::internal::RegistryRegistrar {
                module_path: module_path!(),
                location: file!(),
                name: concat!(module_path!(), "::", stringify!($factory)),
                create: $factory,
            }
        }
    };
}

/// Exports everything published in the current crate for loading as a dynamic library module.
#[macro_export]
macro_rules! export_module {
    () => {
        #[no_mangle]
        pub fn springtime_module() -> $crate::scanning::ModuleExports {
            $crate::scanning::ModuleExports::collect()
        }
    };
}

#[doc(hidden)]
pub mod internal {
    use crate::registry::Registry;
    use crate::scanning::{ModuleInfo, ScannedRegistry, ScannedType};
    use inventory::collect;
    pub use inventory::submit;

    pub struct TypeRegistrar {
        pub module_path: &'static str,
        pub location: &'static str,
        pub register: fn(module: ModuleInfo) -> ScannedType,
    }

    pub struct RegistryRegistrar {
        pub module_path: &'static str,
        pub location: &'static str,
        pub name: &'static str,
        pub create: fn() -> Registry,
    }

    impl RegistryRegistrar {
        pub(crate) fn to_scanned(&self, module: ModuleInfo) -> ScannedRegistry {
            ScannedRegistry {
                module,
                name: self.name,
                create: self.create,
            }
        }
    }

    collect!(TypeRegistrar);
    collect!(RegistryRegistrar);
}

#[cfg(test)]
mod tests {
    use crate::scanning::{generic_family, ModuleInfo, ModuleKind, Scanner};
    use std::fs;
    use std::path::Path;

    #[test]
    fn should_name_linked_modules_after_crates() {
        let module = ModuleInfo::linked("app_reports::jobs::cleanup", "src\\jobs\\cleanup.rs");

        assert_eq!(module.name, "app_reports");
        assert_eq!(module.location, "src/jobs/cleanup.rs");
        assert_eq!(module.kind, ModuleKind::Linked);
    }

    #[test]
    fn should_name_library_modules_after_files() {
        let module = ModuleInfo::library(Path::new("/opt/app/ext/libreports_extension.so"));

        assert_eq!(module.name, "libreports_extension.so");
        assert_eq!(module.location, "/opt/app/ext/libreports_extension.so");
        assert_eq!(module.kind, ModuleKind::Library);
    }

    #[test]
    fn should_extract_generic_family() {
        assert_eq!(
            generic_family("dyn app::Handler<app::Event> + core::marker::Send + core::marker::Sync"),
            "app::Handler"
        );
        assert_eq!(generic_family("app::Handler<u8>"), "app::Handler");
        assert_eq!(generic_family("app::Plain"), "app::Plain");
    }

    #[test]
    fn should_fail_on_missing_module_directory() {
        let directory = tempfile::tempdir().unwrap();
        let mut scanner = Scanner::new();
        scanner.modules_from_path(directory.path().join("missing"), |_| true);

        assert!(scanner.scan().is_err());
    }

    #[test]
    fn should_skip_filtered_and_foreign_files() {
        let directory = tempfile::tempdir().unwrap();
        fs::write(directory.path().join("notes.txt"), "not a library").unwrap();
        fs::write(
            directory
                .path()
                .join(format!("libskipped{}", std::env::consts::DLL_SUFFIX)),
            "not a library either",
        )
        .unwrap();

        let mut scanner = Scanner::new();
        scanner.modules_from_path(directory.path(), |_| false);

        let result = scanner.scan().unwrap();
        assert!(result.types.is_empty());
        assert!(result.registries.is_empty());
    }

    #[test]
    fn should_report_invalid_libraries() {
        let directory = tempfile::tempdir().unwrap();
        fs::write(
            directory
                .path()
                .join(format!("libbroken{}", std::env::consts::DLL_SUFFIX)),
            "not a library",
        )
        .unwrap();

        let mut scanner = Scanner::new();
        scanner.modules_from_path(directory.path(), |_| true);

        assert!(scanner.scan().is_err());
    }
}
