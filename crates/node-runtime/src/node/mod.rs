//! # Simulated Nodes
//!
//! Stand-ins for the autonomous agents that take part in consensus. Each
//! node owns a normalised attribute vector, advances a round counter while
//! active, answers the coordinator with a proof over its state, and folds
//! published consensus results back in through its `MergePolicy`.
//!
//! Two agents push states apart between rounds: a per-node adversary that
//! redraws attributes at random, and a network-wide observer that
//! broadcasts small influence vectors.

mod agents;
mod listener;
mod merge;

pub use agents::{random_influence, run_adversary, run_observer, OBSERVER_ID};
pub use listener::{run_listener, run_worker};
pub use merge::{MergePolicy, DEFAULT_BLEND_ALPHA};

use async_trait::async_trait;
use ob_01_proof_verifier::{CommitmentBundle, ProofBundle, ProofScheme, StateBundle, ZkpManager};
use ob_03_consensus::{NodeError, NodeHandle};
use ob_telemetry::log_node_event;
use parking_lot::RwLock;
use rand::Rng;
use shared_types::{normalize_attributes, Attributes, ConsensusResult, NodeId, NodeState, NodeStatus};
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Attribute keys every node starts with, in equal shares.
pub const DEFAULT_ATTRIBUTE_KEYS: [&str; 3] = ["utilitarian", "deontological", "virtue"];

/// Round counter cap for `advance`.
pub const DEFAULT_RECURSION_LIMIT: u64 = 100;

/// Raw draw per attribute in an adversarial challenge, before renormalising.
pub const CHALLENGE_RANGE: RangeInclusive<f64> = 0.2..=0.5;

/// Equal shares over `DEFAULT_ATTRIBUTE_KEYS`.
pub fn default_attributes() -> Attributes {
    let share = 1.0 / DEFAULT_ATTRIBUTE_KEYS.len() as f64;
    DEFAULT_ATTRIBUTE_KEYS
        .iter()
        .map(|key| (key.to_string(), share))
        .collect()
}

struct NodeInner {
    state: NodeState,
    last_merged_round: Option<u64>,
}

/// One simulated participant.
pub struct SimNode {
    id: NodeId,
    inner: RwLock<NodeInner>,
    scheme: ProofScheme,
    zkp: Arc<ZkpManager>,
    faulty: bool,
    merge_policy: MergePolicy,
    recursion_limit: u64,
}

impl SimNode {
    /// An honest, active node with default attributes.
    ///
    /// Schnorr nodes must also be registered with `zkp.initialize_node`.
    pub fn new(id: NodeId, scheme: ProofScheme, zkp: Arc<ZkpManager>) -> Self {
        Self {
            id,
            inner: RwLock::new(NodeInner {
                state: NodeState::new(id, default_attributes()),
                last_merged_round: None,
            }),
            scheme,
            zkp,
            faulty: false,
            merge_policy: MergePolicy::default(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// A faulty node tampers with every proof it produces.
    pub fn with_faulty(mut self, faulty: bool) -> Self {
        self.faulty = faulty;
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn with_recursion_limit(mut self, limit: u64) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Replace the attribute vector. Not normalised here.
    pub fn with_attributes(self, attributes: Attributes) -> Self {
        self.inner.write().state.attributes = attributes;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn scheme(&self) -> ProofScheme {
        self.scheme
    }

    pub fn is_faulty(&self) -> bool {
        self.faulty
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.merge_policy
    }

    pub fn recursion_limit(&self) -> u64 {
        self.recursion_limit
    }

    /// Copy of the current state.
    pub fn state(&self) -> NodeState {
        self.inner.read().state.clone()
    }

    pub fn attributes(&self) -> Attributes {
        self.inner.read().state.attributes.clone()
    }

    pub fn status(&self) -> NodeStatus {
        self.inner.read().state.status
    }

    pub fn set_status(&self, status: NodeStatus) {
        let mut inner = self.inner.write();
        if inner.state.status != status {
            log_node_event!(info, "node", self.id, "Status changed", from = %inner.state.status.as_str(), to = %status.as_str());
            inner.state.status = status;
        }
    }

    pub fn round_counter(&self) -> u64 {
        self.inner.read().state.round_counter
    }

    /// Round of the last consensus result folded in.
    pub fn last_merged_round(&self) -> Option<u64> {
        self.inner.read().last_merged_round
    }

    /// Step the round counter.
    ///
    /// Only `Active` nodes advance, and never past the recursion limit.
    /// Returns whether the counter moved.
    pub fn advance(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.state.status != NodeStatus::Active
            || inner.state.round_counter >= self.recursion_limit
        {
            return false;
        }
        inner.state.round_counter += 1;
        true
    }

    /// Whether the node has reached its recursion limit.
    pub fn is_exhausted(&self) -> bool {
        self.round_counter() >= self.recursion_limit
    }

    /// Scale each attribute by `1 + influence[key]` and renormalise.
    ///
    /// Keys missing from `influence` are scaled by one. Values that would go
    /// negative are floored at zero. If nothing positive remains the state
    /// is left unchanged and `false` is returned.
    pub fn apply_influence(&self, influence: &Attributes) -> bool {
        let mut inner = self.inner.write();
        let mut scaled = inner.state.attributes.clone();
        for (key, value) in scaled.iter_mut() {
            let factor = 1.0 + influence.get(key).copied().unwrap_or(0.0);
            *value = (*value * factor).max(0.0);
        }
        if !normalize_attributes(&mut scaled) {
            log_node_event!(warn, "node", self.id, "Influence rejected, no positive mass left");
            return false;
        }
        inner.state.attributes = scaled;
        log_node_event!(debug, "node", self.id, "Influence applied", attributes = ?inner.state.attributes);
        true
    }

    /// Adversarial challenge: redraw every attribute from `CHALLENGE_RANGE`
    /// and renormalise.
    ///
    /// Fires only at an even, non-zero round counter. Returns whether the
    /// state changed.
    pub fn challenge<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        let mut inner = self.inner.write();
        let depth = inner.state.round_counter;
        if depth == 0 || depth % 2 != 0 {
            return false;
        }

        let mut drawn: Attributes = inner
            .state
            .attributes
            .keys()
            .map(|key| (key.clone(), rng.gen_range(CHALLENGE_RANGE)))
            .collect();
        if !normalize_attributes(&mut drawn) {
            return false;
        }
        inner.state.attributes = drawn;
        log_node_event!(info, "adversary", self.id, "Challenge applied", depth, attributes = ?inner.state.attributes);
        true
    }

    /// Fold a published result into local attributes.
    ///
    /// Results for rounds not newer than the last one folded are ignored.
    pub fn fold_consensus(&self, result: &ConsensusResult) -> bool {
        let mut inner = self.inner.write();
        if inner.last_merged_round.is_some_and(|round| round >= result.round) {
            log_node_event!(debug, "node", self.id, "Stale consensus ignored", round = result.round);
            return false;
        }

        let NodeInner {
            state,
            last_merged_round,
        } = &mut *inner;
        if !self.merge_policy.merge(&mut state.attributes, &result.attributes) {
            log_node_event!(warn, "node", self.id, "Consensus merge failed", round = result.round);
            return false;
        }
        *last_merged_round = Some(result.round);
        log_node_event!(info, "node", self.id, "Consensus merged", round = result.round, policy = %self.merge_policy);
        true
    }

    /// Snapshot the state and prove it with the configured scheme.
    ///
    /// # Errors
    ///
    /// `NodeError::Proof` when a Schnorr node was never registered.
    pub fn prove(&self) -> Result<StateBundle, NodeError> {
        let state = self.state();
        let mut proof = match self.scheme {
            ProofScheme::Commitment => ProofBundle::Commitment(CommitmentBundle::prove(&state)),
            ProofScheme::Schnorr => ProofBundle::Schnorr(self.zkp.create_state_proof(self.id, &state)?),
        };
        if self.faulty {
            tamper(&mut proof);
        }
        Ok(StateBundle { state, proof })
    }
}

fn tamper(proof: &mut ProofBundle) {
    match proof {
        ProofBundle::Commitment(bundle) => bundle.proof.0[0] ^= 0x01,
        ProofBundle::Schnorr(proof) => proof.s += 1u32,
    }
}

#[async_trait]
impl NodeHandle for SimNode {
    fn id(&self) -> NodeId {
        self.id
    }

    async fn verifiable_state(&self) -> Result<StateBundle, NodeError> {
        self.prove()
    }
}
