use springtime_container::component::Component;
use springtime_container::container::Container;
use springtime_container::instance_provider::{
    ComponentInstanceProvider, ComponentInstanceProviderError, ComponentInstancePtr,
};
use springtime_container::{component_alias, injectable};
use std::sync::atomic::{AtomicUsize, Ordering};

trait Clock {
    fn now(&self) -> u64;
}

injectable!(dyn Clock + Send + Sync);

struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        42
    }
}

impl Component for SystemClock {
    fn create(
        _instance_provider: &mut dyn ComponentInstanceProvider,
    ) -> Result<Self, ComponentInstanceProviderError> {
        Ok(Self)
    }
}

component_alias!(dyn Clock + Send + Sync => SystemClock);

struct FrozenClock;

impl Clock for FrozenClock {
    fn now(&self) -> u64 {
        0
    }
}

impl Component for FrozenClock {
    fn create(
        _instance_provider: &mut dyn ComponentInstanceProvider,
    ) -> Result<Self, ComponentInstanceProviderError> {
        Ok(Self)
    }
}

component_alias!(dyn Clock + Send + Sync => FrozenClock);

static REQUESTS: AtomicUsize = AtomicUsize::new(0);

// a transient component - new for each request, but shared within a nested container
struct Request {
    id: usize,
}

impl Component for Request {
    fn create(
        _instance_provider: &mut dyn ComponentInstanceProvider,
    ) -> Result<Self, ComponentInstanceProviderError> {
        Ok(Self {
            id: REQUESTS.fetch_add(1, Ordering::SeqCst),
        })
    }
}

fn main() {
    let container = Container::configure(|registry| {
        registry
            .register::<SystemClock>()
            .singleton()
            .alias::<dyn Clock + Send + Sync>();
        registry.register::<Request>();

        // registrations in a profile override default ones for the same alias
        registry.profile("testing", |profile| {
            profile
                .register::<FrozenClock>()
                .alias::<dyn Clock + Send + Sync>();
        });
    })
    .expect("error building container");

    let clock = container
        .get_instance::<dyn Clock + Send + Sync>()
        .expect("error creating clock");
    let testing_clock = container
        .get_profile("testing")
        .expect("error creating profile")
        .get_instance::<dyn Clock + Send + Sync>()
        .expect("error creating testing clock");

    println!(
        "Default clock: {}, testing clock: {}",
        clock.now(),
        testing_clock.now()
    );

    let nested = container.nested_container();
    let first: ComponentInstancePtr<Request> =
        nested.get_instance().expect("error creating request");
    let second: ComponentInstancePtr<Request> =
        nested.get_instance().expect("error creating request");
    println!(
        "Requests in nested container: {} and {}",
        first.id, second.id
    );

    // releases the tracked request
    nested.dispose();
}
