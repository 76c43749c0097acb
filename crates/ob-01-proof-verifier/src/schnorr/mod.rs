//! # Schnorr Identification
//!
//! Non-interactive proof of knowledge of `x` with `y = g^x mod p`, bound to a
//! message hash through Fiat-Shamir.
//!
//! ```text
//! prove(x, m):   k <- [1, q)
//!                r = g^k mod p
//!                h = H(m || pad(r)) mod q
//!                s = (k - x*h) mod q
//!
//! verify(y, m):  g^s * y^h mod p == r
//!                H(m || pad(r)) mod q == h
//! ```

mod params;

pub use params::GroupParameters;

use crate::encoding::hex_biguint;
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use shared_crypto::{Digest256, Sha256Hasher};
use std::fmt;

/// A node's signing keys. The private half never leaves the registry.
#[derive(Clone)]
pub struct Keypair {
    private: BigUint,
    public: BigUint,
}

impl Keypair {
    /// `g^private mod p`.
    pub fn public(&self) -> &BigUint {
        &self.public
    }

    pub(crate) fn private(&self) -> &BigUint {
        &self.private
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("private", &"<redacted>")
            .field("public", &self.public.to_str_radix(16))
            .finish()
    }
}

/// Proof transcript `{r, s, h}`, hex-encoded on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrProof {
    /// Commitment `g^k mod p`.
    #[serde(with = "hex_biguint")]
    pub r: BigUint,
    /// Response `(k - x*h) mod q`.
    #[serde(with = "hex_biguint")]
    pub s: BigUint,
    /// Fiat-Shamir challenge.
    #[serde(with = "hex_biguint")]
    pub h: BigUint,
}

/// Draw `private` uniformly from `[1, q)` and derive the public key.
pub fn generate_keypair(params: &GroupParameters) -> Keypair {
    let private = random_scalar(params);
    let public = params.g.modpow(&private, &params.p);
    Keypair { private, public }
}

/// Prove knowledge of `private`, bound to `message_hash`.
pub fn create_proof(
    params: &GroupParameters,
    private: &BigUint,
    message_hash: &Digest256,
) -> SchnorrProof {
    let k = random_scalar(params);
    let r = params.g.modpow(&k, &params.p);
    let h = challenge(params, message_hash, &r);

    let xh = (private * &h) % &params.q;
    let s = ((&k % &params.q) + &params.q - xh) % &params.q;

    SchnorrProof { r, s, h }
}

/// Check a transcript against `public` and `message_hash`.
///
/// Out-of-range components are rejected before any exponentiation.
pub fn verify_proof(
    params: &GroupParameters,
    public: &BigUint,
    message_hash: &Digest256,
    proof: &SchnorrProof,
) -> bool {
    let one = BigUint::one();
    if public <= &one || public >= &params.p {
        return false;
    }
    if proof.r.is_zero() || proof.r >= params.p {
        return false;
    }
    if proof.s >= params.q || proof.h >= params.q {
        return false;
    }

    let lhs = (params.g.modpow(&proof.s, &params.p) * public.modpow(&proof.h, &params.p)) % &params.p;
    if lhs != proof.r {
        return false;
    }

    challenge(params, message_hash, &proof.r) == proof.h
}

/// `SHA-256(message_hash || r) mod q`, with `r` big-endian and left-padded
/// to the byte length of `p`.
fn challenge(params: &GroupParameters, message_hash: &Digest256, r: &BigUint) -> BigUint {
    let width = params.element_len();
    let raw = r.to_bytes_be();
    let mut encoded = vec![0u8; width.saturating_sub(raw.len())];
    encoded.extend_from_slice(&raw);

    let mut hasher = Sha256Hasher::new();
    hasher.update(message_hash.as_bytes()).update(&encoded);
    let digest = hasher.finalize();

    BigUint::from_bytes_be(digest.as_bytes()) % &params.q
}

fn random_scalar(params: &GroupParameters) -> BigUint {
    OsRng.gen_biguint_range(&BigUint::one(), &params.q)
}
