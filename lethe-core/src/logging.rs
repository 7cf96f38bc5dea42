//! Subscriber setup for hosts that embed the engine.
//!
//! The library itself only emits `tracing` events; hosts that do not
//! already install a subscriber can call [`init_logging`] once at startup.

use std::io;

use tracing_subscriber::EnvFilter;

use crate::config::GeneralConfig;
use crate::error::{LetheError, Result};

/// Install a stderr `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `config.log_level` is used.
///
/// # Errors
/// Returns `LetheError::Config` if the level is not a valid filter or a
/// global subscriber is already installed.
pub fn init_logging(config: &GeneralConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| LetheError::Config(format!("invalid log level {:?}: {e}", config.log_level)))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| LetheError::Config(format!("logging already initialised: {e}")))
}
