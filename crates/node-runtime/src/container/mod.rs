//! # Service Container
//!
//! Central container holding every core service instance with proper
//! lifetime management and dependency injection.
//!
//! - Services are built in dependency order (broker, ledger and key registry
//!   first, then nodes, then the coordinator)
//! - Nodes reach the core only through the broker and the `NodeHandle` port

pub mod config;
pub mod services;

pub use config::{ConfigError, NodeConfig, SimulationConfig};
pub use services::ServiceContainer;
