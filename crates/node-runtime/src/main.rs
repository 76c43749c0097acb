//! # Ouroboros Node Runtime
//!
//! Runs a simulated network of nodes that authenticate their state with
//! challenge-response proofs and reconcile it into a trust-weighted
//! consensus every round.
//!
//! ```text
//!   SimNode ×N ──verifiable_state──→ Coordinator ──verify──→ StateVerifier
//!       ↑                                 │
//!       │                  weights_for    │   publish(consensus)
//!       │          TrustLedger ←──────────┴──────────→ MessageBroker
//!       └──────────────── listener ←──────────────────────┘
//! ```
//!
//! Configuration comes from `OB_*` environment variables (see
//! `NodeConfig::from_env`), logging from `OB_LOG_LEVEL` / `RUST_LOG`.

use anyhow::{Context, Result};
use node_runtime::{NodeConfig, NodeRuntime};
use ob_telemetry::{init_logging, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let telemetry = TelemetryConfig::from_env();
    init_logging(&telemetry).context("Failed to initialize logging")?;

    // Load configuration
    let config = NodeConfig::from_env().context("Failed to load configuration")?;

    // Create and start the runtime
    let runtime = NodeRuntime::new(config).context("Invalid configuration")?;
    runtime.start();

    // Keep the simulation running
    info!("Simulation is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    // Graceful shutdown
    runtime.shutdown().await;

    Ok(())
}
