//! Crypto error types.

use thiserror::Error;

/// Cryptographic encoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Input was not valid hex
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    /// Decoded value had the wrong size
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },
}
