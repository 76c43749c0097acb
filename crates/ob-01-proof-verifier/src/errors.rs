//! Proof verifier error types.

use shared_types::NodeId;
use thiserror::Error;

/// Proof verifier errors.
///
/// A proof that simply does not check out is not an error; verification
/// returns `false` for it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ZkpError {
    /// The node has no registered keypair.
    #[error("Node {0} is not initialized in the key registry")]
    NotInitialized(NodeId),

    /// `(p, q, g)` do not describe a prime-order subgroup.
    #[error("Invalid group parameters: {0}")]
    InvalidGroupParameters(String),

    /// A wire value could not be decoded.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}
