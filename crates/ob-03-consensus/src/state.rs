use crate::domain::RoundPhase;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Mutable state of the coordinator: the round counter and current phase.
pub struct CoordinatorState {
    round: AtomicU64,
    phase: RwLock<RoundPhase>,
}

impl CoordinatorState {
    pub fn new() -> Self {
        Self {
            round: AtomicU64::new(0),
            phase: RwLock::new(RoundPhase::Idle),
        }
    }

    /// Last round started (0 before the first).
    pub fn current_round(&self) -> u64 {
        self.round.load(Ordering::SeqCst)
    }

    pub(crate) fn begin_round(&self) -> u64 {
        self.round.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn phase(&self) -> RoundPhase {
        *self.phase.read()
    }

    pub(crate) fn transition(&self, round: u64, next: RoundPhase) {
        let previous = std::mem::replace(&mut *self.phase.write(), next);
        debug!(round, from = %previous, to = %next, "Round phase transition");
    }
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self::new()
    }
}
