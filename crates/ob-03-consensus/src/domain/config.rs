//! Coordinator configuration

use super::ConsensusError;
use serde::{Deserialize, Serialize};
use shared_types::NodeId;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Fraction of known peers whose proofs must verify.
///
/// Kept as a ratio so the threshold is exact: `ceil(numerator * P / denominator)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quorum {
    pub numerator: u32,
    pub denominator: u32,
}

impl Quorum {
    /// Byzantine two-thirds.
    pub const TWO_THIRDS: Quorum = Quorum {
        numerator: 2,
        denominator: 3,
    };

    pub fn new(numerator: u32, denominator: u32) -> Result<Self, ConsensusError> {
        let quorum = Self {
            numerator,
            denominator,
        };
        quorum.validate()?;
        Ok(quorum)
    }

    /// Fraction must lie in `(0, 1]`.
    pub fn validate(&self) -> Result<(), ConsensusError> {
        if self.denominator == 0 {
            return Err(ConsensusError::InvalidQuorum("zero denominator".into()));
        }
        if self.numerator == 0 || self.numerator > self.denominator {
            return Err(ConsensusError::InvalidQuorum(format!(
                "{self} is outside (0, 1]"
            )));
        }
        Ok(())
    }

    /// Valid proofs needed out of `peers`.
    pub fn required(&self, peers: usize) -> usize {
        let num = u64::from(self.numerator) * peers as u64;
        let den = u64::from(self.denominator.max(1));
        num.div_ceil(den) as usize
    }

    /// With no peers a quorum can never be met.
    pub fn is_met(&self, valid: usize, peers: usize) -> bool {
        peers > 0 && valid >= self.required(peers)
    }
}

impl Default for Quorum {
    fn default() -> Self {
        Self::TWO_THIRDS
    }
}

impl fmt::Display for Quorum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for Quorum {
    type Err = ConsensusError;

    /// Parses `"n/d"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = s
            .split_once('/')
            .ok_or_else(|| ConsensusError::InvalidQuorum(format!("expected n/d, got {s:?}")))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|e| ConsensusError::InvalidQuorum(format!("{part:?}: {e}")))
        };
        Self::new(parse(num)?, parse(den)?)
    }
}

/// Coordinator configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Sleep between rounds (milliseconds)
    pub round_interval_ms: u64,
    /// Per-node bound on state collection (milliseconds)
    pub collection_timeout_ms: u64,
    /// Valid-proof threshold
    pub quorum: Quorum,
    /// Sender id stamped on published results
    pub coordinator_id: NodeId,
}

impl ConsensusConfig {
    pub fn round_interval(&self) -> Duration {
        Duration::from_millis(self.round_interval_ms)
    }

    pub fn collection_timeout(&self) -> Duration {
        Duration::from_millis(self.collection_timeout_ms)
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            round_interval_ms: 5_000,
            collection_timeout_ms: 1_000,
            quorum: Quorum::TWO_THIRDS,
            coordinator_id: NodeId(0),
        }
    }
}
