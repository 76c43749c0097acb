//! # Error Types
//!
//! Defines error types used across subsystems.

use thiserror::Error;

/// Violations of the `NodeState` distribution invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    /// The attribute vector is empty.
    #[error("State has no attributes")]
    EmptyAttributes,

    /// An attribute value is NaN or infinite.
    #[error("Attribute {key} is not a finite number")]
    NonFinite { key: String },

    /// An attribute value is negative.
    #[error("Attribute {key} is negative: {value}")]
    NegativeAttribute { key: String, value: f64 },

    /// Attribute values do not sum to one.
    #[error("Attributes sum to {sum}, expected 1")]
    NotNormalized { sum: f64 },
}

/// Errors decoding a wire message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// Recipient id is negative but not the broadcast sentinel.
    #[error("Invalid recipient id: {0}")]
    InvalidRecipient(i64),

    /// Payload did not match the expected shape for its kind.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}
