//! Error types for bridge operations

use thiserror::Error;

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Error type for bridge and router operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Malformed constructor options or an unusable argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The bridge is not in a state that allows the requested transition
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Operation attempted outside `Connected`, or cancelled by a disconnect
    #[error("disconnected: {0}")]
    Disconnected(String),

    /// No response arrived before the request deadline
    #[error("request {request_id} timed out after {timeout_ms}ms")]
    Timeout { request_id: u64, timeout_ms: u64 },

    /// Malformed envelope or application message, or an undeclared message type
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A handler broke the response contract or failed while a response was expected
    #[error("handler error: {0}")]
    Handler(String),

    /// The remote side answered with an error response
    #[error("error response received: {0}")]
    Remote(serde_json::Value),

    /// The transport adapter failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Encoding or decoding failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl BridgeError {
    /// Returns a stable numeric code for this error kind
    pub fn error_code(&self) -> u32 {
        match self {
            BridgeError::InvalidArgument(_) => 1,
            BridgeError::InvalidState { .. } => 2,
            BridgeError::Disconnected(_) => 3,
            BridgeError::Timeout { .. } => 4,
            BridgeError::Protocol(_) => 5,
            BridgeError::Handler(_) => 6,
            BridgeError::Remote(_) => 7,
            BridgeError::Transport(_) => 8,
            BridgeError::Serialization(_) => 9,
        }
    }

    /// Check if the error was produced by the remote side rather than locally
    pub fn is_remote(&self) -> bool {
        matches!(self, BridgeError::Remote(_))
    }

    /// Text carried as `data` when this error is turned into an error response
    pub fn response_message(&self) -> String {
        match self {
            BridgeError::Remote(serde_json::Value::String(s)) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}
