//! # Commitment Scheme
//!
//! `challenge = SHA-256(canonical(state) || nonce)`.
//!
//! The prover later recomputes the same digest as its proof; the verifier
//! recomputes it again and compares in constant time. This certifies that the
//! prover held the exact state and nonce behind the challenge. It does not
//! hide either of them.

use shared_crypto::{ct_eq, sha256_many, Digest256, Nonce};
use shared_types::NodeState;

/// Issue a fresh challenge for `state`.
///
/// Draws a 256-bit nonce from the OS RNG.
pub fn generate_challenge(state: &NodeState) -> (Digest256, Nonce) {
    let nonce = Nonce::random();
    (create_proof(state, &nonce), nonce)
}

/// Digest of `(canonical(state), nonce)`.
pub fn create_proof(state: &NodeState, nonce: &Nonce) -> Digest256 {
    sha256_many(&[&state.canonical_bytes(), nonce.as_bytes()])
}

/// Recompute the digest and compare against `proof` in constant time.
pub fn verify_proof(state: &NodeState, proof: &Digest256, nonce: &Nonce) -> bool {
    let expected = create_proof(state, nonce);
    ct_eq(expected.as_bytes(), proof.as_bytes())
}
