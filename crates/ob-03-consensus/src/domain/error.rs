//! Error types for the consensus coordinator

use shared_types::{MessageError, NodeId};

/// Consensus error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConsensusError {
    #[error("Quorum not met: {valid} valid of {peers} peers, required {required}")]
    QuorumNotMet {
        valid: usize,
        required: usize,
        peers: usize,
    },

    #[error("No peers registered")]
    NoPeers,

    #[error("Node {node_id} unavailable: {reason}")]
    NodeUnavailable { node_id: NodeId, reason: String },

    #[error("Invalid quorum: {0}")]
    InvalidQuorum(String),

    #[error("Result encoding failed: {0}")]
    Encoding(#[from] MessageError),
}
