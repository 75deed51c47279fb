//! Logging setup for front ends embedding the installer
//!
//! The library itself only emits `tracing` events. A binary calls
//! [`init_logging`] once to print them to stderr.

use crate::{PackageError, Result};
use std::io;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter for a `-v` count: 0 warn, 1 info, 2 debug, 3+ trace
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over `verbosity` when set. Returns `Ok(false)` when a
/// global subscriber was already installed.
pub fn init_logging(verbosity: u8) -> Result<bool> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level_for_verbosity(verbosity))
            .map_err(|e| PackageError::Configuration(format!("invalid log filter: {}", e)))?,
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    Ok(tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
        .is_ok())
}
