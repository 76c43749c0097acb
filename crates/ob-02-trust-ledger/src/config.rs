//! Trust ledger configuration.

use serde::{Deserialize, Serialize};

/// Trust score bounds and adjustment steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Score given to a node on first reference.
    pub initial_trust: f64,
    /// Lower clamp.
    pub minimum_trust: f64,
    /// Added on a successful verification.
    pub success_delta: f64,
    /// Added on a failed verification (negative).
    pub failure_delta: f64,
}

impl TrustConfig {
    /// Copy with every value usable by the ledger.
    ///
    /// Non-finite values fall back: `minimum_trust` to 0.0, `initial_trust`
    /// to 1.0 and the deltas to 0.0. Both bounds are then forced into
    /// `[0, 1]` with `initial_trust >= minimum_trust`.
    pub fn sanitized(self) -> Self {
        let finite_or = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };
        let minimum_trust = finite_or(self.minimum_trust, 0.0).clamp(0.0, 1.0);
        Self {
            minimum_trust,
            initial_trust: finite_or(self.initial_trust, 1.0).clamp(minimum_trust, 1.0),
            success_delta: finite_or(self.success_delta, 0.0),
            failure_delta: finite_or(self.failure_delta, 0.0),
        }
    }
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            initial_trust: 1.0,
            minimum_trust: 0.1,
            success_delta: 0.1,
            failure_delta: -0.2,
        }
    }
}
