use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber filtered by the `RUST_LOG` environment variable. Returns
/// `false`, if another global subscriber is already installed.
pub fn install_tracing_logger() -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .try_init()
        .is_ok();

    if !installed {
        debug!("Global tracing subscriber already installed.");
    }

    installed
}
