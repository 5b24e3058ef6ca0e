//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber. `debug` raises the default
/// level to `debug` when `RUST_LOG` is not set.
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
