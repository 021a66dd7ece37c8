//! Handler registry keyed by message type

use msgbridge_core::{BridgeResult, Dispatch, Rejection};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Handler invoked with the payload of a message
///
/// Return [`Dispatch::Handled`] for events, [`Dispatch::Reply`] to answer a
/// request. A synchronous `Err` fails the dispatch.
pub type Handler = Arc<dyn Fn(Option<Value>) -> BridgeResult<Dispatch> + Send + Sync>;

/// Identifies one registration, used to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

/// Wrap a closure as a [`Handler`]
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(Option<Value>) -> BridgeResult<Dispatch> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Handler for one-way messages
pub fn event_handler<F>(f: F) -> Handler
where
    F: Fn(Option<Value>) + Send + Sync + 'static,
{
    Arc::new(move |payload| {
        f(payload);
        Ok(Dispatch::Handled)
    })
}

/// Handler answering requests with the output of an async closure
pub fn request_handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, Rejection>> + Send + 'static,
{
    Arc::new(move |payload| Ok(Dispatch::reply(f(payload))))
}

/// Ordered handler lists per message type
///
/// Handlers for one type run in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    next_id: u64,
    handlers: HashMap<String, Vec<(HandlerId, Handler)>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `message_type`
    pub fn register(&mut self, message_type: impl Into<String>, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers
            .entry(message_type.into())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove a registration; returns false if it was already removed
    pub fn remove(&mut self, id: HandlerId) -> bool {
        let mut emptied = None;
        let mut removed = false;
        for (message_type, list) in self.handlers.iter_mut() {
            let before = list.len();
            list.retain(|(handler_id, _)| *handler_id != id);
            if list.len() != before {
                removed = true;
                if list.is_empty() {
                    emptied = Some(message_type.clone());
                }
                break;
            }
        }
        if let Some(message_type) = emptied {
            self.handlers.remove(&message_type);
        }
        removed
    }

    /// Snapshot of the handlers for `message_type`, in registration order
    pub fn handlers_for(&self, message_type: &str) -> Vec<Handler> {
        self.handlers
            .get(message_type)
            .map(|list| list.iter().map(|(_, handler)| handler.clone()).collect())
            .unwrap_or_default()
    }

    pub fn contains_type(&self, message_type: &str) -> bool {
        self.handlers.contains_key(message_type)
    }

    /// Total number of registrations
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<(&str, usize)> = self
            .handlers
            .iter()
            .map(|(message_type, list)| (message_type.as_str(), list.len()))
            .collect();
        types.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &types)
            .finish()
    }
}
