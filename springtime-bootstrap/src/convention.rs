//! Registration convention adding every scanned implementation of a plugin type to the registry.

use derivative::Derivative;
use springtime_container::component::Injectable;
use springtime_container::registry::Registry;
use springtime_container::scanning::{
    generic_family, PluginTypeInfo, RegistrationConvention, ScannedType, TypeSet,
};
use springtime_container::scope::{SINGLETON, TRANSIENT};
use std::any::{type_name, TypeId};
use tracing::debug;

/// Function returning an optional instance name for a scanned type.
pub type PluginNameFunction = Box<dyn Fn(&ScannedType) -> Option<String> + Send + Sync>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PluginType {
    Closed {
        type_id: TypeId,
        type_name: &'static str,
    },
    Family(&'static str),
}

/// Registers each scanned type which can be cast to the plugin type as an implementation of that
/// type.
///
/// The plugin type is either closed, e.g. `dyn Handler<Created> + Send + Sync`, or a generic trait
/// family. In the latter case, each type is registered as the first instantiation of the family it
/// implements:
///
/// ```
/// use springtime_bootstrap::convention::CustomTypePluginConvention;
///
/// trait Handler<E> {}
///
/// let convention = CustomTypePluginConvention::for_generic::<dyn Handler<()> + Send + Sync>()
///     .with_name(|scanned| Some(scanned.type_name.to_string()))
///     .as_singleton(true);
/// ```
#[derive(Derivative)]
#[derivative(Debug)]
pub struct CustomTypePluginConvention {
    plugin_type: PluginType,
    #[derivative(Debug = "ignore")]
    name: PluginNameFunction,
    as_singleton: bool,
}

impl CustomTypePluginConvention {
    fn new(plugin_type: PluginType) -> Self {
        Self {
            plugin_type,
            name: Box::new(|_| None),
            as_singleton: false,
        }
    }

    /// Convention for a closed plugin type.
    pub fn for_type<T: Injectable + ?Sized>() -> Self {
        Self::new(PluginType::Closed {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        })
    }

    /// Convention for all instantiations of the generic trait, which `T` is an instantiation of.
    /// Generic arguments and auto traits of `T` are irrelevant.
    pub fn for_generic<T: ?Sized>() -> Self {
        Self::new(PluginType::Family(generic_family(type_name::<T>())))
    }

    /// Uses given function to name registered instances. Empty names are ignored.
    pub fn with_name<F: Fn(&ScannedType) -> Option<String> + Send + Sync + 'static>(
        mut self,
        name: F,
    ) -> Self {
        self.name = Box::new(name);
        self
    }

    /// Registers instances as singletons instead of transients.
    pub fn as_singleton(mut self, as_singleton: bool) -> Self {
        self.as_singleton = as_singleton;
        self
    }

    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.as_singleton
    }

    /// Returns the least specific valid type to register given type as.
    fn matches(&self, scanned: &ScannedType) -> Option<PluginTypeInfo> {
        match self.plugin_type {
            PluginType::Closed { type_id, .. } => scanned.plugin_type(type_id),
            PluginType::Family(family) => scanned
                .first_plugin_type_in_family(family)
                .or_else(|| {
                    (generic_family(scanned.type_name) == family)
                        .then(|| scanned.as_plugin_type())
                }),
        }
    }

    fn plugin_type_name(&self) -> &'static str {
        match self.plugin_type {
            PluginType::Closed { type_name, .. } => type_name,
            PluginType::Family(family) => family,
        }
    }
}

impl RegistrationConvention for CustomTypePluginConvention {
    fn scan_types(&self, types: &TypeSet, registry: &mut Registry) {
        let scope_name = if self.as_singleton {
            SINGLETON
        } else {
            TRANSIENT
        };

        for scanned in types.find_types() {
            let Some(plugin_type) = self.matches(scanned) else {
                continue;
            };

            let name = (self.name)(scanned).filter(|name| !name.is_empty());

            debug!(
                "Registering {} from {} as {}.",
                scanned.type_name, scanned.module, plugin_type.type_name
            );

            registry.add_plugin(&plugin_type, scanned, scope_name, name);
        }

        debug!(
            "Applied plugin convention for {} to {} types.",
            self.plugin_type_name(),
            types.len()
        );
    }
}
