//! Id-indexed peer table shared by the runtime and the coordinator.

use crate::ports::NodeHandle;
use parking_lot::RwLock;
use shared_types::NodeId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Known peers, ordered by id.
#[derive(Default)]
pub struct NodeTable {
    nodes: RwLock<BTreeMap<NodeId, Arc<dyn NodeHandle>>>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a peer. Returns the handle it replaced.
    pub fn register(&self, node: Arc<dyn NodeHandle>) -> Option<Arc<dyn NodeHandle>> {
        self.nodes.write().insert(node.id(), node)
    }

    pub fn remove(&self, node_id: NodeId) -> Option<Arc<dyn NodeHandle>> {
        self.nodes.write().remove(&node_id)
    }

    pub fn get(&self, node_id: NodeId) -> Option<Arc<dyn NodeHandle>> {
        self.nodes.read().get(&node_id).cloned()
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.read().contains_key(&node_id)
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.read().keys().copied().collect()
    }

    /// Point-in-time copy of every handle, in id order.
    pub fn handles(&self) -> Vec<Arc<dyn NodeHandle>> {
        self.nodes.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}
