//! Bounded log of published consensus results, for read-only observers.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{HandlerError, MessageHandler};
use shared_types::{ConsensusResult, Message};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

/// Ring buffer of the most recent results.
///
/// Register it with the broker for `MessageKind::Consensus` and it records
/// every published result.
pub struct ConsensusHistory {
    entries: RwLock<VecDeque<ConsensusResult>>,
    capacity: usize,
}

impl ConsensusHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn record(&self, result: ConsensusResult) {
        let mut entries = self.entries.write();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(result);
    }

    pub fn latest(&self) -> Option<ConsensusResult> {
        self.entries.read().back().cloned()
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<ConsensusResult> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ConsensusHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[async_trait]
impl MessageHandler for ConsensusHistory {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        let result = ConsensusResult::from_message(message)
            .map_err(|e| HandlerError::Failed(e.to_string()))?;
        self.record(result);
        Ok(())
    }

    fn name(&self) -> &str {
        "consensus-history"
    }
}
