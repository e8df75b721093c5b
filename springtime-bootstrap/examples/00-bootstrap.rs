use springtime_bootstrap::config::{BootstrapConfig, ConfigurationSection};
use springtime_bootstrap::container_scope::ContainerScope;
use springtime_bootstrap::ioc;
use springtime_container::component::Component;
use springtime_container::instance_provider::{
    ComponentInstanceProvider, ComponentInstanceProviderError,
};
use springtime_container::registry::Registry;
use springtime_container::scan_registry;

struct ReportGenerator {
    connection_string: String,
}

impl Component for ReportGenerator {
    fn create(
        _instance_provider: &mut dyn ComponentInstanceProvider,
    ) -> Result<Self, ComponentInstanceProviderError> {
        // a real application would fail here, e.g. with a ConstructorError
        let connection_string = ConfigurationSection::load_for_type::<Self>()
            .and_then(|section| section.connection_string("reports"))
            .unwrap_or_else(|_| "postgres://localhost/reports".to_string());

        Ok(Self { connection_string })
    }
}

// registries published this way are found when bootstrapping
fn reports_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<ReportGenerator>();
    registry
}

scan_registry!(reports_registry);

// code which cannot take part in dependency injection can still get a container
fn generate_report() {
    let scope = ContainerScope::new().expect("error creating container scope");
    let generator = scope
        .container()
        .get_instance::<ReportGenerator>()
        .expect("error creating report generator");

    println!("Generating report using {}", generator.connection_string);
}

fn main() {
    // application modules are found by crate name - this example's crate is named after the file
    let config = BootstrapConfig::new(true, "bootstrap".to_string(), false);

    ioc::bootstrap(&config).expect("error bootstrapping container");
    ioc::assert_configuration_is_valid().expect("invalid container configuration");

    generate_report();
}
