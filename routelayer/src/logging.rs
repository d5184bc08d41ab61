//! Logging setup for hosts embedding the routing control.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is the host's call. This helper wires up a sensible console subscriber:
//! - single-line compact format on stderr
//! - configurable via the `RUST_LOG` environment variable
//! - defaults to `info` when `RUST_LOG` is unset

use std::io;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter directive most hosts want when `RUST_LOG` is unset.
pub fn default_filter() -> &'static str {
    "info"
}

/// Initialize console logging for the process.
///
/// `fallback_filter` applies when `RUST_LOG` is unset (see
/// [`default_filter`]). Call at most once; a second call fails because the
/// global subscriber is already installed.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init_logging(
    fallback_filter: &str,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
}
