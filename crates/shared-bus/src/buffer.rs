//! # Offline Buffer
//!
//! Bounded FIFO of messages held for a recipient with no live channel.

use shared_types::Message;
use std::collections::VecDeque;

/// Bounded FIFO with oldest-first eviction.
#[derive(Debug, Clone)]
pub struct OfflineBuffer {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl OfflineBuffer {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Append a message, evicting the oldest entry first when full.
    ///
    /// Returns the evicted message, if any.
    pub fn push(&mut self, message: Message) -> Option<Message> {
        let evicted = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    /// Remove and return every message in FIFO order.
    pub fn drain(&mut self) -> Vec<Message> {
        self.messages.drain(..).collect()
    }

    /// Put `older` back ahead of everything buffered, keeping FIFO order.
    ///
    /// If that overflows capacity the oldest entries are dropped. Returns
    /// how many were dropped.
    pub fn requeue_front(&mut self, older: Vec<Message>) -> usize {
        for message in older.into_iter().rev() {
            self.messages.push_front(message);
        }
        let overflow = self.messages.len().saturating_sub(self.capacity);
        self.messages.drain(..overflow);
        overflow
    }

    /// Iterate buffered messages oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the buffer holds nothing.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Maximum number of retained messages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
