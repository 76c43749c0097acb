//! # Node Runtime Library
//!
//! Builds and drives one Ouroboros simulation: a message broker, a proof
//! verifier, a trust ledger, a set of simulated nodes and the consensus
//! coordinator. The main entry point is the `main.rs` binary; the library
//! exposes the same pieces for integration tests.
//!
//! ## Modules
//!
//! - `container/` - configuration and the service container
//! - `node/` - simulated nodes, their merge policy and background tasks
//! - `runtime` - task spawning and graceful shutdown

pub mod container;
pub mod node;
pub mod runtime;

pub use container::{ConfigError, NodeConfig, ServiceContainer, SimulationConfig};
pub use node::{MergePolicy, SimNode};
pub use runtime::NodeRuntime;
