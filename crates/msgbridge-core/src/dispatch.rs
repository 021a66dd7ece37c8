//! Dispatch types shared by the bridge engine and the handler router

use crate::{BridgeError, BridgeResult};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future producing the response to a request
///
/// Resolving with `Ok` answers with a success response; resolving with `Err`
/// answers with an error response carrying the rejection value.
pub type ReplyFuture = Pin<Box<dyn Future<Output = Result<Value, Rejection>> + Send + 'static>>;

/// Callback the engine invokes for every inbound request or event
pub type DispatchFn = Arc<dyn Fn(Value) -> BridgeResult<Dispatch> + Send + Sync>;

/// Wrap a closure as a [`DispatchFn`]
pub fn dispatch_fn<F>(f: F) -> DispatchFn
where
    F: Fn(Value) -> BridgeResult<Dispatch> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What a dispatch function did with an inbound message
pub enum Dispatch {
    /// Handled synchronously; no response will be produced
    Handled,
    /// A response will be produced by the future
    Reply(ReplyFuture),
}

impl Dispatch {
    /// Create a reply from a future
    pub fn reply<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, Rejection>> + Send + 'static,
    {
        Dispatch::Reply(Box::pin(future))
    }

    /// Create a reply that resolves immediately with a value
    pub fn resolved(value: Value) -> Self {
        Self::reply(std::future::ready(Ok(value)))
    }

    /// Create a reply that rejects immediately
    pub fn rejected(rejection: impl Into<Rejection>) -> Self {
        let rejection = rejection.into();
        Self::reply(std::future::ready(Err(rejection)))
    }

    /// Check if a response will be produced
    pub fn is_reply(&self) -> bool {
        matches!(self, Dispatch::Reply(_))
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatch::Handled => write!(f, "Handled"),
            Dispatch::Reply(_) => write!(f, "Reply(..)"),
        }
    }
}

/// Reason a reply future failed, sent verbatim as the error response's `data`
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection(pub Value);

impl Rejection {
    /// Create a rejection carrying a value
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// Get the carried value
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<&str> for Rejection {
    fn from(message: &str) -> Self {
        Self(Value::String(message.to_string()))
    }
}

impl From<String> for Rejection {
    fn from(message: String) -> Self {
        Self(Value::String(message))
    }
}

impl From<Value> for Rejection {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<BridgeError> for Rejection {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Remote(value) => Self(value),
            other => Self(Value::String(other.to_string())),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other),
        }
    }
}
