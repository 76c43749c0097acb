//! # Shared Crypto - Hashing and Comparison Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | State commitments, Fiat-Shamir challenges |
//! | `constant_time` | `subtle` | Digest comparison without timing leaks |
//! | `random` | OS RNG | Commitment nonces |
//!
//! ## Security Properties
//!
//! - **SHA-256**: 256-bit digests for every commitment and challenge
//! - **Constant-time equality**: Proof digests are never compared with `==`
//! - **Nonces**: drawn from the operating system RNG, at least 128 bits

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constant_time;
pub mod errors;
pub mod hashing;
pub mod random;

// Re-exports
pub use constant_time::ct_eq;
pub use errors::CryptoError;
pub use hashing::{sha256, sha256_many, Digest256, Sha256Hasher};
pub use random::{random_bytes, Nonce, NONCE_LEN};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
