//! # Key Registry
//!
//! `ZkpManager` owns one Schnorr keypair per registered node and produces or
//! checks proofs over that node's canonical state.

use crate::errors::ZkpError;
use crate::schnorr::{self, GroupParameters, Keypair, SchnorrProof};
use num_bigint::BigUint;
use parking_lot::RwLock;
use shared_crypto::{sha256, Digest256};
use shared_types::{NodeId, NodeState};
use std::collections::HashMap;
use tracing::debug;

/// Per-node Schnorr key registry.
pub struct ZkpManager {
    params: GroupParameters,
    keys: RwLock<HashMap<NodeId, Keypair>>,
}

impl ZkpManager {
    /// Create a registry over a validated group.
    ///
    /// # Errors
    ///
    /// `ZkpError::InvalidGroupParameters` if `params` fail validation.
    pub fn new(params: GroupParameters) -> Result<Self, ZkpError> {
        params.validate()?;
        Ok(Self {
            params,
            keys: RwLock::new(HashMap::new()),
        })
    }

    /// The group this registry signs in.
    pub fn params(&self) -> &GroupParameters {
        &self.params
    }

    /// Generate and store a keypair for `node_id`, replacing any previous
    /// one. Returns the public key.
    pub fn initialize_node(&self, node_id: NodeId) -> BigUint {
        let keys = schnorr::generate_keypair(&self.params);
        let public = keys.public().clone();
        self.keys.write().insert(node_id, keys);
        debug!(%node_id, "Schnorr keypair registered");
        public
    }

    /// Prove knowledge of the node's key, bound to `state`.
    ///
    /// # Errors
    ///
    /// `ZkpError::NotInitialized` if the node has no keypair.
    pub fn create_state_proof(
        &self,
        node_id: NodeId,
        state: &NodeState,
    ) -> Result<SchnorrProof, ZkpError> {
        let keys = self.keys.read();
        let pair = keys.get(&node_id).ok_or(ZkpError::NotInitialized(node_id))?;
        Ok(schnorr::create_proof(&self.params, pair.private(), &state_hash(state)))
    }

    /// Verify a node's proof over `state` with its stored public key.
    ///
    /// # Errors
    ///
    /// `ZkpError::NotInitialized` if the node has no keypair.
    pub fn verify_state_proof(
        &self,
        node_id: NodeId,
        state: &NodeState,
        proof: &SchnorrProof,
    ) -> Result<bool, ZkpError> {
        let public = self
            .public_key(node_id)
            .ok_or(ZkpError::NotInitialized(node_id))?;
        Ok(schnorr::verify_proof(&self.params, &public, &state_hash(state), proof))
    }

    /// Stored public key, if the node is registered.
    pub fn public_key(&self, node_id: NodeId) -> Option<BigUint> {
        self.keys.read().get(&node_id).map(|k| k.public().clone())
    }

    /// True if the node has a keypair.
    pub fn is_initialized(&self, node_id: NodeId) -> bool {
        self.keys.read().contains_key(&node_id)
    }

    /// Forget a node's keys. Returns false if none were registered.
    pub fn remove_node(&self, node_id: NodeId) -> bool {
        self.keys.write().remove(&node_id).is_some()
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.keys.read().len()
    }
}

impl Default for ZkpManager {
    fn default() -> Self {
        Self {
            params: GroupParameters::default(),
            keys: RwLock::new(HashMap::new()),
        }
    }
}

/// SHA-256 of the canonical state encoding.
pub fn state_hash(state: &NodeState) -> Digest256 {
    sha256(&state.canonical_bytes())
}
