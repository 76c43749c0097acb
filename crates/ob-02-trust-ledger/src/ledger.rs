//! # Trust Ledger
//!
//! One `TrustRecord` per node behind a single `RwLock`, so an update's
//! read-add-clamp is atomic with respect to concurrent readers.

use crate::config::TrustConfig;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_types::message::monotonic_timestamp;
use shared_types::NodeId;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Upper clamp for every score.
pub const MAX_TRUST: f64 = 1.0;

/// Weight reported for a node the ledger has never seen.
pub const UNTRACKED_WEIGHT: f64 = 1.0;

/// Reputation of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustRecord {
    pub node_id: NodeId,
    /// Always within `[minimum_trust, 1.0]`.
    pub score: f64,
    pub successes: u64,
    pub failures: u64,
    /// `monotonic_timestamp` of the last update (or creation).
    pub last_updated: f64,
}

/// Per-node trust scores.
pub struct TrustLedger {
    config: TrustConfig,
    records: RwLock<HashMap<NodeId, TrustRecord>>,
}

impl TrustLedger {
    /// Create an empty ledger.
    ///
    /// Unusable config values are replaced through `TrustConfig::sanitized`.
    pub fn new(config: TrustConfig) -> Self {
        let sanitized = config.sanitized();
        if sanitized != config {
            warn!(?config, ?sanitized, "Trust configuration adjusted");
        }
        Self {
            config: sanitized,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// Current score, creating the record with `initial_trust` if needed.
    pub fn get_or_create(&self, node_id: NodeId) -> f64 {
        if let Some(record) = self.records.read().get(&node_id) {
            return record.score;
        }
        let mut records = self.records.write();
        self.entry(&mut records, node_id).score
    }

    /// Apply one verification outcome and return the new score.
    pub fn update(&self, node_id: NodeId, success: bool) -> f64 {
        let (delta, floor) = (
            if success {
                self.config.success_delta
            } else {
                self.config.failure_delta
            },
            self.floor(),
        );

        let mut records = self.records.write();
        let record = self.entry(&mut records, node_id);
        let previous = record.score;
        record.score = (record.score + delta).clamp(floor, MAX_TRUST);
        if success {
            record.successes += 1;
        } else {
            record.failures += 1;
        }
        record.last_updated = monotonic_timestamp();

        debug!(%node_id, success, previous, score = record.score, "Trust updated");
        record.score
    }

    /// Scores for `ids` in the given order; untracked ids weigh
    /// `UNTRACKED_WEIGHT`. Never creates records.
    pub fn weights_for(&self, ids: &[NodeId]) -> Vec<f64> {
        let records = self.records.read();
        ids.iter()
            .map(|id| records.get(id).map_or(UNTRACKED_WEIGHT, |r| r.score))
            .collect()
    }

    /// Score without creating a record.
    pub fn score(&self, node_id: NodeId) -> Option<f64> {
        self.records.read().get(&node_id).map(|r| r.score)
    }

    pub fn record(&self, node_id: NodeId) -> Option<TrustRecord> {
        self.records.read().get(&node_id).cloned()
    }

    /// All records, ordered by node id.
    pub fn snapshot(&self) -> Vec<TrustRecord> {
        let mut records: Vec<_> = self.records.read().values().cloned().collect();
        records.sort_by_key(|r| r.node_id);
        records
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn floor(&self) -> f64 {
        self.config.minimum_trust
    }

    fn entry<'a>(
        &self,
        records: &'a mut HashMap<NodeId, TrustRecord>,
        node_id: NodeId,
    ) -> &'a mut TrustRecord {
        let initial = self.config.initial_trust;
        records.entry(node_id).or_insert_with(|| TrustRecord {
            node_id,
            score: initial,
            successes: 0,
            failures: 0,
            last_updated: monotonic_timestamp(),
        })
    }
}

impl Default for TrustLedger {
    fn default() -> Self {
        Self::new(TrustConfig::default())
    }
}
