//! Codec trait and JSON implementation

use crate::Envelope;
use msgbridge_core::BridgeError;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            CodecError::Deserialization(err.to_string())
        } else {
            CodecError::Serialization(err.to_string())
        }
    }
}

impl From<CodecError> for BridgeError {
    fn from(err: CodecError) -> Self {
        match err {
            // Undecodable input is a malformed envelope from the engine's point of view
            CodecError::Deserialization(_) | CodecError::InvalidFormat(_) => {
                BridgeError::Protocol(err.to_string())
            }
            CodecError::Serialization(_) => BridgeError::Serialization(err.to_string()),
        }
    }
}

/// Trait for envelope encoding and decoding
///
/// `decode` only has to produce a JSON value; the engine validates its shape
/// before treating it as an [`Envelope`].
pub trait Codec: Send + Sync + 'static {
    /// Encode an envelope to its wire string
    fn encode(&self, envelope: &Envelope) -> Result<String, CodecError>;

    /// Decode a wire string to a value
    fn decode(&self, raw: &str) -> Result<Value, CodecError>;

    /// Get the content type for this codec
    fn content_type(&self) -> &'static str;
}

/// JSON codec implementation using serde_json
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    /// Whether to pretty-print output (default: false for efficiency)
    pretty: bool,
}

impl JsonCodec {
    /// Create a new JSON codec
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Create a JSON codec that pretty-prints output
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Codec for JsonCodec {
    fn encode(&self, envelope: &Envelope) -> Result<String, CodecError> {
        if self.pretty {
            serde_json::to_string_pretty(envelope).map_err(Into::into)
        } else {
            serde_json::to_string(envelope).map_err(Into::into)
        }
    }

    fn decode(&self, raw: &str) -> Result<Value, CodecError> {
        serde_json::from_str(raw).map_err(Into::into)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}
