//! # Observability Infrastructure
//!
//! Structured logging for the client. Library code only emits `tracing`
//! events; installing a subscriber is left to the binary, which may use
//! [`init_logging`].

pub mod logging;

pub use logging::log_config_info;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::errors::{CloudAvenueError, Result};

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over the configured directive. Calling this
/// twice returns a `Config` error instead of panicking.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.default_directive()))
        .map_err(|e| {
            CloudAvenueError::config_with_source("Invalid log filter directive", Box::new(e))
        })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| CloudAvenueError::config(format!("Logging already initialized: {}", e)))?;

    tracing::debug!(json = config.json, "Logging initialized");
    Ok(())
}
