//! # Shared Types Crate
//!
//! This crate contains the domain entities, the broker `Message` envelope and
//! the `ConsensusResult` payload shared by every subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Checked, not repaired**: `NodeState` invariants are validated by the
//!   core but never silently fixed up.
//! - **Closed message kinds**: Routing is keyed by the `MessageKind` enum, not
//!   by free-form strings.

pub mod consensus;
pub mod entities;
pub mod errors;
pub mod message;

pub use consensus::ConsensusResult;
pub use entities::*;
pub use errors::*;
pub use message::{Message, MessageKind, Recipient, BROADCAST_SENTINEL};
