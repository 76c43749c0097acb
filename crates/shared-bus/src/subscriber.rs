//! # Subscriptions
//!
//! The receiving side of the broker: one `Subscription` per delivery channel.

use parking_lot::RwLock;
use shared_types::{Message, NodeId};
use std::collections::{BTreeMap, HashMap};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The channel was unsubscribed or the broker dropped.
    #[error("Subscription closed")]
    Closed,
}

/// Identifier of one delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// Live channels per node. A node with no channels has no entry.
pub(crate) type SubscriberTable = HashMap<NodeId, BTreeMap<SubscriptionId, mpsc::UnboundedSender<Message>>>;

/// Remove one channel from the table, dropping the node entry when empty.
pub(crate) fn remove_channel(
    table: &mut SubscriberTable,
    node_id: NodeId,
    id: SubscriptionId,
) -> bool {
    let Some(channels) = table.get_mut(&node_id) else {
        return false;
    };
    let removed = channels.remove(&id).is_some();
    if channels.is_empty() {
        table.remove(&node_id);
    }
    removed
}

/// A delivery channel held by a node.
///
/// When dropped, the channel is removed from the broker; if it was the
/// node's last channel the node goes offline and further messages buffer.
pub struct Subscription {
    node_id: NodeId,
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<Message>,
    table: Arc<RwLock<SubscriberTable>>,
}

impl Subscription {
    pub(crate) fn new(
        node_id: NodeId,
        id: SubscriptionId,
        receiver: mpsc::UnboundedReceiver<Message>,
        table: Arc<RwLock<SubscriberTable>>,
    ) -> Self {
        Self {
            node_id,
            id,
            receiver,
            table,
        }
    }

    /// The node owning this channel.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The channel id, used with `unsubscribe` and `deliver_buffered`.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Receive the next message.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next message in publish order
    /// - `None` - The channel was unsubscribed and fully drained
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Try to receive the next message without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was queued
    /// - `Ok(None)` - Nothing queued right now
    /// - `Err(SubscriptionError::Closed)` - The channel is closed and drained
    pub fn try_recv(&mut self) -> Result<Option<Message>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Stop accepting new messages without leaving the broker.
    ///
    /// Messages already queued can still be received. The broker prunes
    /// the channel on its next delivery attempt.
    pub fn close(&mut self) {
        self.receiver.close();
    }

    /// Convert into a `Stream` of messages.
    pub fn into_stream(self) -> MessageStream {
        MessageStream { subscription: self }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if remove_channel(&mut self.table.write(), self.node_id, self.id) {
            debug!(node_id = %self.node_id, subscription = self.id.0, "Subscription dropped");
        }
    }
}

/// A stream wrapper for subscriptions.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
pub struct MessageStream {
    subscription: Subscription,
}

impl MessageStream {
    /// The node owning the underlying channel.
    pub fn node_id(&self) -> NodeId {
        self.subscription.node_id
    }
}

impl Stream for MessageStream {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.subscription.receiver.poll_recv(cx)
    }
}
