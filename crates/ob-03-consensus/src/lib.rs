//! # ob-03-consensus
//!
//! Consensus coordinator for the Ouroboros network.
//!
//! ## Architecture
//!
//! Each round collects a verifiable state bundle from every known peer,
//! filters them through the proof verifier, enforces a two-thirds quorum,
//! aggregates the surviving states by trust weight and broadcasts the
//! result.
//!
//! ```text
//! NodeTable ──verifiable_state()──→ Coordinator ──verify──→ StateVerifier
//!                                        │
//!                           weights_for  │  publish(consensus)
//!                   TrustLedger ←────────┴────────→ MessageBroker
//!                                                        │
//!                                            ConsensusHistory, nodes
//! ```
//!
//! Rounds are strictly sequential. Within a round, collection runs
//! concurrently with a per-node timeout, so one unresponsive peer cannot
//! stall the network.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ob_03_consensus::{Coordinator, CoordinatorDependencies, IntervalScheduler};
//!
//! let coordinator = Coordinator::new(CoordinatorDependencies {
//!     nodes,
//!     verifier,
//!     trust,
//!     publisher: broker,
//!     config: ConsensusConfig::default(),
//! });
//!
//! let scheduler = IntervalScheduler::new(coordinator.config().round_interval());
//! coordinator.run(scheduler, shutdown_rx).await;
//! ```

pub mod domain;
pub mod history;
pub mod nodes;
pub mod ports;
pub mod scheduler;
pub mod service;
pub mod state;

// Re-export main types
pub use domain::{aggregate, Aggregate, ConsensusConfig, ConsensusError, Quorum, RoundPhase, RoundReport};
pub use history::{ConsensusHistory, DEFAULT_HISTORY_CAPACITY};
pub use nodes::NodeTable;
pub use ports::{MessagePublisher, NodeError, NodeHandle};
pub use scheduler::{IntervalScheduler, ManualScheduler, ManualTrigger, RoundScheduler};
pub use service::{Coordinator, CoordinatorDependencies};
