//! Subscriber installation.
//!
//! Human-readable output by default; with `json_logs` every event is one JSON
//! object carrying the structured fields (`node_id`, `round`, `kind`, ...).

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::EnvFilter;

/// Parse the configured filter directives.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::InvalidFilter(format!("{:?}: {e}", config.log_level)))
}

/// Install the global fmt subscriber.
///
/// # Errors
///
/// - `TelemetryError::InvalidFilter` - `log_level` does not parse
/// - `TelemetryError::AlreadyInitialized` - another subscriber is installed
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(config.thread_ids);

    let installed = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        filter = %config.log_level,
        "Logging initialized"
    );
    Ok(())
}
