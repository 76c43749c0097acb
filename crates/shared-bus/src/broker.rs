//! # Message Broker
//!
//! Routes messages to per-node delivery channels, buffers for offline
//! recipients, and runs kind-keyed handlers after routing.

use crate::buffer::OfflineBuffer;
use crate::handler::{HandlerError, HandlerId, HandlerTable, MessageHandler};
use crate::subscriber::{remove_channel, SubscriberTable, Subscription, SubscriptionId};
use crate::DEFAULT_BUFFER_CAPACITY;
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use shared_types::{Message, MessageKind, NodeId, Recipient};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

/// Broker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Maximum messages held per offline recipient.
    pub buffer_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Broker errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The handle is not a live channel of the node.
    #[error("Unknown subscription {subscription:?} for {node_id}")]
    UnknownSubscription {
        node_id: NodeId,
        subscription: SubscriptionId,
    },
}

/// Outcome of routing one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent to `channels` live channels (zero for a broadcast with no subscribers).
    Delivered { channels: usize },
    /// Recipient offline; stored in its buffer.
    Buffered {
        /// Buffer length after the append.
        buffered: usize,
        /// True when the oldest entry was dropped to make room.
        evicted: bool,
    },
}

/// Snapshot of broker occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStatus {
    pub total_buffered_messages: usize,
    pub nodes_with_buffers: usize,
    pub subscribers_count: usize,
    pub channels: usize,
    pub messages_published: u64,
    pub messages_evicted: u64,
}

/// Trait for publishing messages.
///
/// The consensus core depends on this rather than on the concrete broker.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Route a message and run its handlers.
    async fn publish(&self, message: Message) -> Delivery;
}

/// In-memory message broker.
///
/// Lock order is subscribers before buffers. No lock is held while a
/// handler runs.
pub struct MessageBroker {
    config: BrokerConfig,
    subscribers: Arc<RwLock<SubscriberTable>>,
    buffers: Mutex<HashMap<NodeId, OfflineBuffer>>,
    handlers: Mutex<HandlerTable>,
    next_subscription: AtomicU64,
    next_handler: AtomicU64,
    messages_published: AtomicU64,
    messages_evicted: AtomicU64,
}

impl MessageBroker {
    /// Create a broker with the default buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: BrokerConfig) -> Self {
        Self {
            config,
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            buffers: Mutex::new(HashMap::new()),
            handlers: Mutex::new(HandlerTable::default()),
            next_subscription: AtomicU64::new(1),
            next_handler: AtomicU64::new(1),
            messages_published: AtomicU64::new(0),
            messages_evicted: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn config(&self) -> BrokerConfig {
        self.config
    }

    /// Open a new delivery channel for `node_id`.
    ///
    /// A node may hold several channels; each receives every message
    /// addressed to the node. Buffered messages are not flushed here, call
    /// `deliver_buffered` with the returned handle.
    #[must_use]
    pub fn subscribe(&self, node_id: NodeId) -> Subscription {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .entry(node_id)
            .or_default()
            .insert(id, sender);

        debug!(%node_id, subscription = id.0, "New subscription created");
        Subscription::new(node_id, id, receiver, Arc::clone(&self.subscribers))
    }

    /// Remove one channel. Returns false if it was not registered.
    pub fn unsubscribe(&self, node_id: NodeId, subscription: SubscriptionId) -> bool {
        let removed = remove_channel(&mut self.subscribers.write(), node_id, subscription);
        if removed {
            debug!(%node_id, subscription = subscription.0, "Unsubscribed");
        }
        removed
    }

    /// Route `message`, then run every handler registered for its kind.
    ///
    /// Handler failures and panics are logged and do not reach the caller.
    pub async fn publish(&self, message: Message) -> Delivery {
        let delivery = self.route(&message);
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        trace!(
            id = %message.id,
            kind = %message.kind,
            recipient = %message.recipient,
            ?delivery,
            "Message routed"
        );

        self.run_handlers(&message).await;
        delivery
    }

    /// Build and publish a broadcast message.
    pub async fn broadcast(
        &self,
        sender: NodeId,
        kind: MessageKind,
        payload: serde_json::Value,
    ) -> Delivery {
        self.publish(Message::broadcast(sender, kind, payload)).await
    }

    /// Flush the node's offline buffer into the given channel, FIFO.
    ///
    /// # Returns
    ///
    /// - `Ok(n)` - Number of messages delivered. If the channel closes
    ///   mid-flush the rest go back to the front of the buffer
    /// - `Err(BrokerError::UnknownSubscription)` - Handle is not live; the
    ///   buffer is left untouched
    pub fn deliver_buffered(
        &self,
        node_id: NodeId,
        subscription: SubscriptionId,
    ) -> Result<usize, BrokerError> {
        let subscribers = self.subscribers.read();
        let sender = subscribers
            .get(&node_id)
            .and_then(|channels| channels.get(&subscription))
            .ok_or(BrokerError::UnknownSubscription {
                node_id,
                subscription,
            })?;

        let pending = match self.buffers.lock().remove(&node_id) {
            Some(mut buffer) => buffer.drain(),
            None => return Ok(0),
        };

        let mut pending = pending.into_iter();
        let mut delivered = 0;
        while let Some(message) = pending.next() {
            if let Err(unsent) = sender.send(message) {
                let mut requeue = vec![unsent.0];
                requeue.extend(pending);
                warn!(%node_id, delivered, requeued = requeue.len(), "Channel closed while flushing buffer");
                self.requeue(node_id, requeue);
                break;
            }
            delivered += 1;
        }

        debug!(%node_id, delivered, "Delivered buffered messages");
        Ok(delivered)
    }

    /// Register a handler for `kind`. Handlers run in registration order.
    pub fn register_handler(&self, kind: MessageKind, handler: Arc<dyn MessageHandler>) -> HandlerId {
        let id = HandlerId(self.next_handler.fetch_add(1, Ordering::Relaxed));
        debug!(%kind, handler = handler.name(), "Handler registered");
        self.handlers.lock().register(kind, id, handler);
        id
    }

    /// Remove a handler. The kind entry disappears with its last handler.
    pub fn unregister_handler(&self, kind: MessageKind, id: HandlerId) -> bool {
        self.handlers.lock().unregister(kind, id)
    }

    #[must_use]
    pub fn handler_count(&self, kind: MessageKind) -> usize {
        self.handlers.lock().count(kind)
    }

    #[must_use]
    pub fn has_handlers(&self, kind: MessageKind) -> bool {
        self.handlers.lock().contains_kind(kind)
    }

    /// True if the node holds at least one channel.
    #[must_use]
    pub fn is_online(&self, node_id: NodeId) -> bool {
        self.subscribers
            .read()
            .get(&node_id)
            .is_some_and(|channels| !channels.is_empty())
    }

    /// Number of live channels across all nodes.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.subscribers.read().values().map(|c| c.len()).sum()
    }

    /// Messages waiting for `node_id`.
    #[must_use]
    pub fn buffered_count(&self, node_id: NodeId) -> usize {
        self.buffers.lock().get(&node_id).map_or(0, OfflineBuffer::len)
    }

    #[must_use]
    pub fn buffer_status(&self) -> BufferStatus {
        let subscribers = self.subscribers.read();
        let buffers = self.buffers.lock();
        BufferStatus {
            total_buffered_messages: buffers.values().map(OfflineBuffer::len).sum(),
            nodes_with_buffers: buffers.values().filter(|b| !b.is_empty()).count(),
            subscribers_count: subscribers.len(),
            channels: subscribers.values().map(|c| c.len()).sum(),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_evicted: self.messages_evicted.load(Ordering::Relaxed),
        }
    }

    fn route(&self, message: &Message) -> Delivery {
        let mut subscribers = self.subscribers.write();

        match message.recipient {
            Recipient::Broadcast => {
                let mut channels = 0;
                for senders in subscribers.values_mut() {
                    senders.retain(|_, sender| sender.send(message.clone()).is_ok());
                    channels += senders.len();
                }
                subscribers.retain(|_, senders| !senders.is_empty());
                Delivery::Delivered { channels }
            }
            Recipient::Node(node_id) => {
                if let Some(senders) = subscribers.get_mut(&node_id) {
                    senders.retain(|_, sender| sender.send(message.clone()).is_ok());
                    let channels = senders.len();
                    if channels > 0 {
                        return Delivery::Delivered { channels };
                    }
                    subscribers.remove(&node_id);
                }
                self.buffer(node_id, message.clone())
            }
        }
    }

    fn buffer(&self, node_id: NodeId, message: Message) -> Delivery {
        let mut buffers = self.buffers.lock();
        let buffer = buffers
            .entry(node_id)
            .or_insert_with(|| OfflineBuffer::new(self.config.buffer_capacity));

        let evicted = buffer.push(message).is_some();
        if evicted {
            self.messages_evicted.fetch_add(1, Ordering::Relaxed);
            warn!(%node_id, capacity = buffer.capacity(), "Offline buffer full, evicted oldest");
        }

        Delivery::Buffered {
            buffered: buffer.len(),
            evicted,
        }
    }

    fn requeue(&self, node_id: NodeId, older: Vec<Message>) {
        let mut buffers = self.buffers.lock();
        let buffer = buffers
            .entry(node_id)
            .or_insert_with(|| OfflineBuffer::new(self.config.buffer_capacity));

        let dropped = buffer.requeue_front(older);
        if dropped > 0 {
            self.messages_evicted.fetch_add(dropped as u64, Ordering::Relaxed);
            warn!(%node_id, dropped, capacity = buffer.capacity(), "Offline buffer full, evicted oldest");
        }
    }

    async fn run_handlers(&self, message: &Message) {
        let handlers = self.handlers.lock().handlers_for(message.kind);

        for handler in handlers {
            let outcome = AssertUnwindSafe(handler.handle(message))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(panic.as_ref()))));

            if let Err(e) = outcome {
                error!(
                    handler = handler.name(),
                    kind = %message.kind,
                    id = %message.id,
                    error = %e,
                    "Message handler failed"
                );
            }
        }
    }
}

impl Default for MessageBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePublisher for MessageBroker {
    async fn publish(&self, message: Message) -> Delivery {
        MessageBroker::publish(self, message).await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
