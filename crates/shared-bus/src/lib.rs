//! # Shared Bus - Message Broker for Node Communication
//!
//! Topic and recipient addressed delivery between nodes and the consensus
//! core.
//!
//! ## Delivery Rules
//!
//! - **Broadcast** (`recipient_id = -1`): every channel of every node that is
//!   subscribed at publish time
//! - **Online recipient**: every channel the node holds
//! - **Offline recipient**: appended to the node's bounded FIFO buffer; when
//!   full, the oldest entry is evicted first
//! - **Handlers**: after routing, every handler registered for the message
//!   kind runs in registration order; failures are logged and swallowed
//!
//! ```text
//! ┌──────────┐  publish()  ┌──────────────┐  channel  ┌──────────┐
//! │ Sender   │ ──────────→ │ MessageBroker│ ────────→ │ Node A   │
//! └──────────┘             │              │           └──────────┘
//!                          │  [buffer B]  │ ← offline node B
//!                          │  handlers[k] │ ← kind-keyed callbacks
//!                          └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Per-channel delivery order equals publish order
//! - No global order across channels
//! - Buffering is capacity-bounded and lossy under sustained backlog

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod broker;
pub mod buffer;
pub mod handler;
pub mod subscriber;

// Re-export main types
pub use broker::{BrokerConfig, BrokerError, BufferStatus, Delivery, MessageBroker, MessagePublisher};
pub use buffer::OfflineBuffer;
pub use handler::{handler_fn, FnHandler, HandlerError, HandlerId, MessageHandler};
pub use subscriber::{MessageStream, Subscription, SubscriptionError, SubscriptionId};

/// Default per-recipient offline buffer capacity.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;
