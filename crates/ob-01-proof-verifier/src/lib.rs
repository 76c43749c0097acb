//! # OB-01: Proof Verifier
//!
//! Two interchangeable ways for a node to authenticate a claim about its
//! local state.
//!
//! ## Components
//!
//! - `commitment` - Hash commitment over `(canonical(state), nonce)`.
//!   Authenticates, does not hide: the verifier needs the state and nonce.
//! - `schnorr` - Non-interactive Schnorr identification (Fiat-Shamir) over a
//!   fixed prime-order subgroup.
//! - `manager` - Per-node key registry (`ZkpManager`).
//! - `bundle` - Wire bundles and scheme dispatch (`StateVerifier`).
//!
//! ## Security Notes
//!
//! The commitment scheme is not zero-knowledge and gives no soundness
//! against adaptive provers. Only the Schnorr scheme proves knowledge of a
//! secret.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bundle;
pub mod commitment;
pub mod encoding;
pub mod errors;
pub mod manager;
pub mod schnorr;

pub use bundle::{CommitmentBundle, ProofBundle, ProofScheme, StateBundle, StateVerifier};
pub use errors::ZkpError;
pub use manager::ZkpManager;
pub use schnorr::{GroupParameters, Keypair, SchnorrProof};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
