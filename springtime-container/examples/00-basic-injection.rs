use springtime_container::component::Component;
use springtime_container::container::Container;
use springtime_container::instance_provider::{
    ComponentInstanceProvider, ComponentInstanceProviderError, ComponentInstancePtr,
    TypedComponentInstanceProvider,
};
use springtime_container::{component_alias, injectable};

// this is a trait we would like to inject into our component
trait Greeter {
    fn greet(&self) -> String;
}

injectable!(dyn Greeter + Send + Sync);

struct EnglishGreeter;

impl Greeter for EnglishGreeter {
    fn greet(&self) -> String {
        "Hello world!".to_string()
    }
}

impl Component for EnglishGreeter {
    fn create(
        _instance_provider: &mut dyn ComponentInstanceProvider,
    ) -> Result<Self, ComponentInstanceProviderError> {
        Ok(Self)
    }
}

// we're telling the container EnglishGreeter can be requested as dyn Greeter
component_alias!(dyn Greeter + Send + Sync => EnglishGreeter);

struct Reception {
    greeter: ComponentInstancePtr<dyn Greeter + Send + Sync>,
}

impl Component for Reception {
    fn create(
        instance_provider: &mut dyn ComponentInstanceProvider,
    ) -> Result<Self, ComponentInstanceProviderError> {
        Ok(Self {
            greeter: instance_provider.primary_instance_typed()?,
        })
    }
}

fn main() {
    let container = Container::configure(|registry| {
        registry
            .register::<EnglishGreeter>()
            .singleton()
            .alias::<dyn Greeter + Send + Sync>();
        registry.register::<Reception>();
    })
    .expect("error building container");

    container
        .assert_configuration_is_valid()
        .expect("invalid container configuration");

    let reception = container
        .get_instance::<Reception>()
        .expect("error creating reception");

    println!("{}", reception.greeter.greet());
}
