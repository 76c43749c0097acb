//! # Ouroboros Telemetry
//!
//! Structured logging for every crate in the workspace.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ob_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = TelemetryConfig::from_env();
//!     init_logging(&config)?;
//!     // tracing macros now reach stdout
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OB_LOG_LEVEL` | `info` | `EnvFilter` directives, falls back to `RUST_LOG` |
//! | `OB_JSON_LOGS` | `false` | One JSON object per line |
//! | `OB_SERVICE_NAME` | `ouroboros` | Logged once at startup |
//! | `OB_THREAD_IDS` | `false` | Include thread ids |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};

#[doc(hidden)]
pub use tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Log an event about one node with the standard `subsystem` and `node_id`
/// fields.
///
/// # Example
///
/// ```rust,ignore
/// log_node_event!(info, "node", node_id, "Consensus merged", round = 4);
/// ```
#[macro_export]
macro_rules! log_node_event {
    ($level:ident, $subsystem:expr, $node_id:expr, $msg:expr $(, $($field:tt)*)?) => {
        $crate::tracing::$level!(
            subsystem = $subsystem,
            node_id = %$node_id,
            $($($field)*,)?
            $msg
        )
    };
}
