//! # Proof Bundles
//!
//! What a node hands the coordinator each round, and the dispatcher that
//! checks it with the matching scheme.

use crate::commitment;
use crate::errors::ZkpError;
use crate::manager::ZkpManager;
use crate::schnorr::SchnorrProof;
use serde::{Deserialize, Serialize};
use shared_crypto::{ct_eq, Digest256, Nonce};
use shared_types::{NodeId, NodeState};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Which scheme a node proves with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofScheme {
    /// Hash commitment.
    #[default]
    Commitment,
    /// Schnorr identification.
    Schnorr,
}

impl FromStr for ProofScheme {
    type Err = ZkpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "commitment" => Ok(Self::Commitment),
            "schnorr" => Ok(Self::Schnorr),
            other => Err(ZkpError::InvalidEncoding(format!("unknown proof scheme: {other}"))),
        }
    }
}

impl fmt::Display for ProofScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commitment => f.write_str("commitment"),
            Self::Schnorr => f.write_str("schnorr"),
        }
    }
}

/// `{challenge, nonce, proof}`, all hex on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentBundle {
    /// Digest issued before the proof.
    pub challenge: Digest256,
    /// Nonce behind the challenge.
    pub nonce: Nonce,
    /// Prover's recomputation of the digest.
    pub proof: Digest256,
}

impl CommitmentBundle {
    /// Issue a challenge for `state` and answer it honestly.
    pub fn prove(state: &NodeState) -> Self {
        let (challenge, nonce) = commitment::generate_challenge(state);
        let proof = commitment::create_proof(state, &nonce);
        Self {
            challenge,
            nonce,
            proof,
        }
    }

    /// The proof must reproduce from `(state, nonce)` and equal the issued
    /// challenge.
    pub fn verify(&self, state: &NodeState) -> bool {
        commitment::verify_proof(state, &self.proof, &self.nonce)
            && ct_eq(self.proof.as_bytes(), self.challenge.as_bytes())
    }
}

/// Scheme-tagged proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum ProofBundle {
    /// Hash commitment.
    Commitment(CommitmentBundle),
    /// Schnorr transcript.
    Schnorr(SchnorrProof),
}

impl ProofBundle {
    /// Scheme of this proof.
    pub fn scheme(&self) -> ProofScheme {
        match self {
            Self::Commitment(_) => ProofScheme::Commitment,
            Self::Schnorr(_) => ProofScheme::Schnorr,
        }
    }
}

/// A node's verifiable state for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateBundle {
    /// Claimed state.
    pub state: NodeState,
    /// Proof over `state`.
    pub proof: ProofBundle,
}

/// Dispatches a `StateBundle` to the scheme that produced it.
#[derive(Clone)]
pub struct StateVerifier {
    zkp: Arc<ZkpManager>,
}

impl StateVerifier {
    /// Verifier backed by `zkp` for Schnorr bundles.
    pub fn new(zkp: Arc<ZkpManager>) -> Self {
        Self { zkp }
    }

    /// Key registry used for Schnorr bundles.
    pub fn zkp(&self) -> &Arc<ZkpManager> {
        &self.zkp
    }

    /// Check a bundle fetched from `node_id`.
    ///
    /// A bundle whose state claims a different owner is rejected outright.
    ///
    /// # Errors
    ///
    /// `ZkpError::NotInitialized` for a Schnorr bundle from an unregistered
    /// node.
    pub fn verify(&self, node_id: NodeId, bundle: &StateBundle) -> Result<bool, ZkpError> {
        if bundle.state.node_id != node_id {
            debug!(%node_id, claimed = %bundle.state.node_id, "State owner mismatch");
            return Ok(false);
        }

        match &bundle.proof {
            ProofBundle::Commitment(commitment) => Ok(commitment.verify(&bundle.state)),
            ProofBundle::Schnorr(proof) => {
                self.zkp.verify_state_proof(node_id, &bundle.state, proof)
            }
        }
    }
}
