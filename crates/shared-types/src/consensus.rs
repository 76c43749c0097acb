//! # Consensus Result
//!
//! The payload of a published `consensus` message. Ephemeral: it exists only
//! inside a broker message and in read-only observer history.

use crate::entities::{Attributes, NodeId};
use crate::errors::MessageError;
use crate::message::{monotonic_timestamp, Message, MessageKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of one successful consensus round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Coordinator round number that produced this result.
    pub round: u64,
    /// Trust-weighted mean of every attribute shared by all contributors.
    pub attributes: Attributes,
    /// Nodes whose verified state contributed to the aggregate.
    pub contributing_nodes: BTreeSet<NodeId>,
    /// Creation time in seconds since the Unix epoch.
    pub timestamp: f64,
}

impl ConsensusResult {
    /// Create a result stamped with the current time.
    pub fn new(round: u64, attributes: Attributes, contributing_nodes: BTreeSet<NodeId>) -> Self {
        Self {
            round,
            attributes,
            contributing_nodes,
            timestamp: monotonic_timestamp(),
        }
    }

    /// Encode as a message payload.
    ///
    /// # Errors
    ///
    /// `MessageError::MalformedPayload` if the value cannot be represented.
    pub fn to_payload(&self) -> Result<serde_json::Value, MessageError> {
        serde_json::to_value(self).map_err(|e| MessageError::MalformedPayload(e.to_string()))
    }

    /// Decode from a `consensus` message.
    ///
    /// # Errors
    ///
    /// `MessageError::MalformedPayload` if the message has another kind or
    /// its payload is not a `ConsensusResult`.
    pub fn from_message(message: &Message) -> Result<Self, MessageError> {
        if message.kind != MessageKind::Consensus {
            return Err(MessageError::MalformedPayload(format!(
                "expected consensus message, got {}",
                message.kind
            )));
        }
        message.payload_as()
    }
}
