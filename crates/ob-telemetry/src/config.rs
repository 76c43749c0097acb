//! Telemetry configuration from environment variables.

use std::env;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name, logged at startup
    pub service_name: String,

    /// `EnvFilter` directives (e.g. `info,shared_bus=debug`)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to include thread ids
    pub thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "ouroboros".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            thread_ids: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OB_SERVICE_NAME`: Service name (default: ouroboros)
    /// - `OB_LOG_LEVEL` or `RUST_LOG`: Filter directives (default: info)
    /// - `OB_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `OB_THREAD_IDS`: Include thread ids (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            service_name: lookup("OB_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("OB_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs: lookup("OB_JSON_LOGS").map_or(defaults.json_logs, |v| is_truthy(&v)),
            thread_ids: lookup("OB_THREAD_IDS").map_or(defaults.thread_ids, |v| is_truthy(&v)),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
