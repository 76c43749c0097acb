//! # Message Envelope
//!
//! The unit of delivery for the message broker.
//!
//! ## Wire Shape
//!
//! ```text
//! { id: string, sender_id: integer, recipient_id: integer (-1 = broadcast),
//!   kind: string, payload: object, timestamp: float seconds }
//! ```
//!
//! Routing by kind uses the closed `MessageKind` enum; handlers are keyed by
//! its variants rather than by strings.

use crate::entities::NodeId;
use crate::errors::MessageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Reserved recipient id meaning "all current subscribers".
pub const BROADCAST_SENTINEL: i64 = -1;

/// Kinds of messages that flow through the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A published `ConsensusResult`.
    Consensus,
    /// A node announcing its current state.
    StateSnapshot,
    /// An observer perturbing node attributes.
    Influence,
    /// Liveness signal.
    Heartbeat,
}

impl MessageKind {
    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Consensus => "consensus",
            MessageKind::StateSnapshot => "state_snapshot",
            MessageKind::Influence => "influence",
            MessageKind::Heartbeat => "heartbeat",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addressee of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Recipient {
    /// Every channel of every node subscribed at publish time.
    Broadcast,
    /// Every channel of one node, or its offline buffer.
    Node(NodeId),
}

impl TryFrom<i64> for Recipient {
    type Error = MessageError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == BROADCAST_SENTINEL {
            return Ok(Recipient::Broadcast);
        }
        u32::try_from(value)
            .map(|id| Recipient::Node(NodeId(id)))
            .map_err(|_| MessageError::InvalidRecipient(value))
    }
}

impl From<Recipient> for i64 {
    fn from(recipient: Recipient) -> Self {
        match recipient {
            Recipient::Broadcast => BROADCAST_SENTINEL,
            Recipient::Node(id) => i64::from(id.0),
        }
    }
}

impl From<NodeId> for Recipient {
    fn from(id: NodeId) -> Self {
        Recipient::Node(id)
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Broadcast => f.write_str("broadcast"),
            Recipient::Node(id) => id.fmt(f),
        }
    }
}

/// A message routed by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Globally unique id, generated per message.
    pub id: Uuid,
    /// Originating node.
    #[serde(rename = "sender_id")]
    pub sender: NodeId,
    /// Addressee; `Broadcast` encodes as `-1`.
    #[serde(rename = "recipient_id")]
    pub recipient: Recipient,
    /// Routing tag for handlers.
    pub kind: MessageKind,
    /// Arbitrary structured payload.
    pub payload: serde_json::Value,
    /// Creation time in seconds, from `monotonic_timestamp`.
    pub timestamp: f64,
}

impl Message {
    /// Create a message with a fresh id and the current timestamp.
    pub fn new(
        sender: NodeId,
        recipient: impl Into<Recipient>,
        kind: MessageKind,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            recipient: recipient.into(),
            kind,
            payload,
            timestamp: monotonic_timestamp(),
        }
    }

    /// Create a message addressed to every current subscriber.
    pub fn broadcast(sender: NodeId, kind: MessageKind, payload: serde_json::Value) -> Self {
        Self::new(sender, Recipient::Broadcast, kind, payload)
    }

    /// Whether this message is addressed to every subscriber.
    pub fn is_broadcast(&self) -> bool {
        self.recipient == Recipient::Broadcast
    }

    /// Decode the payload into a typed value.
    ///
    /// # Errors
    ///
    /// `MessageError::MalformedPayload` if the payload does not match `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, MessageError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| MessageError::MalformedPayload(e.to_string()))
    }
}

/// Fractional seconds on a clock that never goes backwards.
///
/// Wall-clock time is sampled once per process; later readings add the
/// `Instant` elapsed since then, so values stay close to Unix time but are
/// immune to system clock adjustments.
pub fn monotonic_timestamp() -> f64 {
    static ANCHOR: OnceLock<(Instant, f64)> = OnceLock::new();
    let (started, wall) = ANCHOR.get_or_init(|| {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        (Instant::now(), wall)
    });
    wall + started.elapsed().as_secs_f64()
}
