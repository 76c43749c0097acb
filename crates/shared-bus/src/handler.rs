//! # Message Handlers
//!
//! Callbacks invoked by the broker for every published message of a given
//! `MessageKind`.

use async_trait::async_trait;
use shared_types::{Message, MessageKind};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Failure raised inside a handler. The broker logs it and moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler reported an error.
    #[error("Handler failed: {0}")]
    Failed(String),

    /// The handler panicked while processing the message.
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

/// Trait for reacting to published messages of one kind.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one message.
    async fn handle(&self, message: &Message) -> Result<(), HandlerError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Handle returned by registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub(crate) u64);

/// Adapter turning an async closure into a `MessageHandler`.
pub struct FnHandler<F> {
    name: String,
    func: F,
}

/// Wrap an async closure as a handler.
///
/// The closure receives an owned copy of the message.
pub fn handler_fn<F, Fut>(name: impl Into<String>, func: F) -> Arc<FnHandler<F>>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler {
        name: name.into(),
        func,
    })
}

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        (self.func)(message.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered handler lists keyed by message kind.
///
/// A kind with no handlers has no entry.
#[derive(Default)]
pub(crate) struct HandlerTable {
    handlers: HashMap<MessageKind, Vec<(HandlerId, Arc<dyn MessageHandler>)>>,
}

impl HandlerTable {
    pub(crate) fn register(
        &mut self,
        kind: MessageKind,
        id: HandlerId,
        handler: Arc<dyn MessageHandler>,
    ) {
        self.handlers.entry(kind).or_default().push((id, handler));
    }

    /// Remove one handler; drops the kind entry when it was the last.
    pub(crate) fn unregister(&mut self, kind: MessageKind, id: HandlerId) -> bool {
        let Some(list) = self.handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(&kind);
        }
        removed
    }

    /// Snapshot of the handlers for `kind`, in registration order.
    pub(crate) fn handlers_for(&self, kind: MessageKind) -> Vec<Arc<dyn MessageHandler>> {
        self.handlers
            .get(&kind)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, kind: MessageKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    pub(crate) fn contains_kind(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}
