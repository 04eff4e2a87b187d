//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Filter priority:
//! 1. `WORKFLOW_TRIALS_LOG` environment variable (e.g. `debug`, `workflow_trials=trace`)
//! 2. `RUST_LOG`
//! 3. the caller's default level
//!
//! Logs go to STDERR so task stdout stays clean for the orchestrator.

use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "WORKFLOW_TRIALS_LOG";

/// Build the filter from the environment, falling back to `default_level`.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if a directive cannot be parsed.
pub fn env_filter(default_level: tracing::Level) -> Result<EnvFilter> {
    let directive = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string().to_lowercase());

    EnvFilter::try_new(&directive)
        .map_err(|e| Error::InvalidConfig(format!("bad log filter '{directive}': {e}")))
}

/// Initialise the global logging subscriber.
///
/// Safe to call once at startup; a second call returns an error instead of
/// panicking.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_tracing(default_level: tracing::Level) -> Result<()> {
    let filter = env_filter(default_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::InvalidConfig(format!("logging already initialised: {e}")))
}
