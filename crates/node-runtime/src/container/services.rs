//! # Service Container
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: MessageBroker, TrustLedger, ZkpManager (no dependencies)
//! Level 1: ConsensusHistory (broker handler), SimNodes, NodeTable
//! Level 2: Coordinator (depends on Level 0-1)
//! ```
//!
//! All services are wrapped in `Arc` for shared ownership; each serializes
//! its own mutations internally.

use std::sync::Arc;

use ob_01_proof_verifier::{ProofScheme, StateVerifier, ZkpManager};
use ob_02_trust_ledger::TrustLedger;
use ob_03_consensus::{
    ConsensusHistory, Coordinator, CoordinatorDependencies, NodeHandle, NodeTable,
};
use shared_bus::{MessageBroker, MessageHandler};
use shared_types::{MessageKind, NodeId};
use tracing::{debug, info};

use crate::container::config::{ConfigError, NodeConfig};
use crate::node::SimNode;

/// Every service of one simulation, wired together.
pub struct ServiceContainer {
    /// Validated configuration the container was built from.
    pub config: NodeConfig,
    /// Message broker shared by nodes, coordinator and observers.
    pub broker: Arc<MessageBroker>,
    /// Per-node reputation.
    pub trust: Arc<TrustLedger>,
    /// Schnorr key registry.
    pub zkp: Arc<ZkpManager>,
    /// Peers the coordinator polls.
    pub nodes: Arc<NodeTable>,
    /// Concrete simulated nodes, in id order.
    pub sim_nodes: Vec<Arc<SimNode>>,
    /// Published results, read-only for observers.
    pub history: Arc<ConsensusHistory>,
    /// Round driver.
    pub coordinator: Arc<Coordinator>,
}

impl ServiceContainer {
    /// Validate `config` and build every service.
    pub fn new(config: NodeConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        // Level 0
        let broker = Arc::new(MessageBroker::with_config(config.broker));
        let trust = Arc::new(TrustLedger::new(config.trust));
        let zkp = Arc::new(ZkpManager::new(config.group.clone())?);

        // Level 1
        let history = Arc::new(ConsensusHistory::default());
        let history_handler: Arc<dyn MessageHandler> = history.clone();
        broker.register_handler(MessageKind::Consensus, history_handler);

        let sim = &config.simulation;
        let nodes = Arc::new(NodeTable::new());
        let mut sim_nodes = Vec::with_capacity(sim.node_count as usize);
        for id in sim.node_ids() {
            if sim.scheme == ProofScheme::Schnorr {
                zkp.initialize_node(id);
            }
            let node = Arc::new(
                SimNode::new(id, sim.scheme, zkp.clone())
                    .with_faulty(sim.faulty_nodes.contains(&id))
                    .with_merge_policy(sim.merge_policy)
                    .with_recursion_limit(sim.recursion_limit),
            );
            let handle: Arc<dyn NodeHandle> = node.clone();
            nodes.register(handle);
            debug!(node_id = %id, faulty = node.is_faulty(), "Node registered");
            sim_nodes.push(node);
        }

        // Level 2
        let coordinator = Arc::new(Coordinator::new(CoordinatorDependencies {
            nodes: nodes.clone(),
            verifier: StateVerifier::new(zkp.clone()),
            trust: trust.clone(),
            publisher: broker.clone(),
            config: config.consensus.clone(),
        }));

        info!(
            nodes = sim_nodes.len(),
            scheme = %sim.scheme,
            quorum = %config.consensus.quorum,
            faulty = ?sim.faulty_nodes,
            "Services initialized"
        );

        Ok(Self {
            config,
            broker,
            trust,
            zkp,
            nodes,
            sim_nodes,
            history,
            coordinator,
        })
    }

    pub fn node(&self, id: NodeId) -> Option<Arc<SimNode>> {
        self.sim_nodes.iter().find(|node| node.id() == id).cloned()
    }
}
