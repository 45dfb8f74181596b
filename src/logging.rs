//! Logging initialization.
//!
//! Log output goes to standard error so it never mixes with command output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "zfs_exec=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system.
///
/// Uses the `RUST_LOG` environment variable for filtering. If not set,
/// defaults to `zfs_exec=info`.
///
/// # Panics
///
/// Panics if another tracing subscriber has already been set.
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Try to initialize the logging system.
///
/// Returns `Err` if a subscriber is already installed.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
}

/// Like [`try_init`], with an explicit filter directive.
///
/// A bare level such as `debug` applies to this crate only; anything else is
/// parsed as a full `EnvFilter` directive. An unparsable filter falls back to
/// the default.
pub fn try_init_with(filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_new(directive(filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
}

fn directive(filter: &str) -> String {
    match filter {
        "error" | "warn" | "info" | "debug" | "trace" | "off" => format!("zfs_exec={}", filter),
        other => other.to_string(),
    }
}
