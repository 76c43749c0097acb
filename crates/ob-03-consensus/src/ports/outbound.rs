//! Driven ports (Outbound dependencies)

use async_trait::async_trait;
use ob_01_proof_verifier::{StateBundle, ZkpError};
use shared_types::NodeId;
use thiserror::Error;

/// Why a node could not hand over a bundle.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Node unavailable: {0}")]
    Unavailable(String),

    #[error("Proof generation failed: {0}")]
    Proof(#[from] ZkpError),
}

/// A peer the coordinator collects state from.
///
/// Implemented by simulated nodes in the runtime and by test doubles.
#[async_trait]
pub trait NodeHandle: Send + Sync {
    fn id(&self) -> NodeId;

    /// Current state plus a proof over it.
    ///
    /// The coordinator bounds this call with its collection timeout; an
    /// error or a timeout counts the node as absent for the round.
    async fn verifiable_state(&self) -> Result<StateBundle, NodeError>;
}
