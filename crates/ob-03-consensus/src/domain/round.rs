//! Round state machine types

use super::ConsensusError;
use serde::{Deserialize, Serialize};
use shared_types::{ConsensusResult, NodeId};
use std::fmt;

/// Phase of the current round.
///
/// ```text
/// Idle → Collecting → Verifying ─┬→ QuorumMet → Aggregating → Published ─┐
///                                └→ QuorumFailed ─────────────────────────┴→ Idle
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    #[default]
    Idle,
    Collecting,
    Verifying,
    QuorumMet,
    Aggregating,
    Published,
    QuorumFailed,
}

impl RoundPhase {
    /// Phases that end a round.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundPhase::Published | RoundPhase::QuorumFailed)
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundPhase::Idle => "idle",
            RoundPhase::Collecting => "collecting",
            RoundPhase::Verifying => "verifying",
            RoundPhase::QuorumMet => "quorum_met",
            RoundPhase::Aggregating => "aggregating",
            RoundPhase::Published => "published",
            RoundPhase::QuorumFailed => "quorum_failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one round.
///
/// Every known peer ends up in exactly one of `valid`, `failed`, `absent`.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundReport {
    pub round: u64,
    /// Last phase reached.
    pub phase: RoundPhase,
    /// Proofs that verified.
    pub valid: Vec<NodeId>,
    /// Responded but failed verification.
    pub failed: Vec<NodeId>,
    /// Timed out or could not produce a bundle.
    pub absent: Vec<NodeId>,
    /// Set when `phase == Published`.
    pub result: Option<ConsensusResult>,
    /// Why the round did not publish.
    pub error: Option<ConsensusError>,
}

impl RoundReport {
    pub(crate) fn new(round: u64) -> Self {
        Self {
            round,
            phase: RoundPhase::Idle,
            valid: Vec::new(),
            failed: Vec::new(),
            absent: Vec::new(),
            result: None,
            error: None,
        }
    }

    pub fn is_published(&self) -> bool {
        self.phase == RoundPhase::Published
    }

    /// Number of peers the round considered.
    pub fn peers(&self) -> usize {
        self.valid.len() + self.failed.len() + self.absent.len()
    }
}
