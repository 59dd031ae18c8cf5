//! Logging bootstrap for binaries and demos embedding the engine.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` is used, e.g.
/// `"finpulse_realtime=debug,info"`. Returns `false` if a subscriber was
/// already installed, which is not an error.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
