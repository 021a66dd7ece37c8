//! Built-in message types

use crate::message::Message;
use crate::registry::{Handler, event_handler};
use msgbridge_core::{BridgeError, BridgeResult, LogLevel};
use serde::{Deserialize, Serialize};

/// Type of the log message
pub const LOG_MESSAGE_TYPE: &str = "log";

/// Payload of a `log` message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LogMessagePayload {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level: Some(level),
            message: Some(message.into()),
        }
    }

    /// Wrap the payload in a `log` message
    pub fn into_message(self) -> BridgeResult<Message> {
        let payload =
            serde_json::to_value(self).map_err(|e| BridgeError::Serialization(e.to_string()))?;
        Ok(Message::new(LOG_MESSAGE_TYPE).with_payload(payload))
    }

    /// Read the payload of a `log` message
    ///
    /// A message without payload yields the empty payload.
    pub fn from_message(message: &Message) -> BridgeResult<Self> {
        if message.message_type != LOG_MESSAGE_TYPE {
            return Err(BridgeError::Protocol(format!(
                "expected a '{}' message, got '{}'",
                LOG_MESSAGE_TYPE, message.message_type
            )));
        }
        match &message.payload {
            None => Ok(Self::default()),
            Some(payload) => serde_json::from_value(payload.clone())
                .map_err(|e| BridgeError::Protocol(format!("invalid log payload: {}", e))),
        }
    }
}

/// Create a `log` message
pub fn log_message(level: LogLevel, message: impl Into<String>) -> BridgeResult<Message> {
    LogMessagePayload::new(level, message).into_message()
}

/// Handler for inbound `log` messages
///
/// Payloads that do not parse are dropped with a warning.
pub fn log_handler<F>(f: F) -> Handler
where
    F: Fn(LogMessagePayload) + Send + Sync + 'static,
{
    event_handler(move |payload| {
        let parsed = match payload {
            None => Ok(LogMessagePayload::default()),
            Some(value) => serde_json::from_value(value),
        };
        match parsed {
            Ok(log) => f(log),
            Err(err) => tracing::warn!(error = %err, "Dropping malformed log message"),
        }
    })
}
