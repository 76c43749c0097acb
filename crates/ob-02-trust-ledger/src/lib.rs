//! # OB-02: Trust Ledger
//!
//! Per-node reputation, adjusted by verification outcome and read back as
//! aggregation weight.
//!
//! ## Rules
//!
//! - A record is created on first reference with `initial_trust`.
//! - Success adds `success_delta`, failure adds `failure_delta`; the result
//!   is clamped to `[minimum_trust, 1.0]`.
//! - `weights_for` never creates records; untracked ids weigh 1.0.
//! - Records are never deleted while the ledger lives.

pub mod config;
pub mod ledger;

pub use config::TrustConfig;
pub use ledger::{TrustLedger, TrustRecord, MAX_TRUST, UNTRACKED_WEIGHT};
