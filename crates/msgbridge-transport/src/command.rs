//! Handshake command framing for transport adapters
//!
//! Adapters that need a connection handshake exchange commands on the same
//! channel as envelopes. A command is the prefix `___` followed by a JSON
//! object `{"type": ..., "data": ...}`; anything without the prefix is an
//! envelope for the engine.

use msgbridge_core::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix marking a raw payload as a handshake command
pub const COMMAND_PREFIX: &str = "___";

/// Handshake command kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    /// Sent by the initiating side
    Connect,
    /// Answer of the awaiting side to `Connect`
    ConnectSuccess,
    /// Sent by the side tearing the channel down
    Disconnect,
}

/// A handshake command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub command_type: CommandType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Command {
    /// Create a command without data
    pub fn new(command_type: CommandType) -> Self {
        Self {
            command_type,
            data: None,
        }
    }

    /// Attach data to the command
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Encode to the prefixed wire form
    pub fn encode(&self) -> BridgeResult<String> {
        Ok(format!("{}{}", COMMAND_PREFIX, serde_json::to_string(self)?))
    }

    /// Decode a raw payload if it is a command
    ///
    /// Returns `Ok(None)` for payloads without the command prefix, and a
    /// protocol error for prefixed payloads that are not a known command.
    pub fn try_decode(raw: &str) -> BridgeResult<Option<Self>> {
        let Some(body) = raw.strip_prefix(COMMAND_PREFIX) else {
            return Ok(None);
        };

        serde_json::from_str(body)
            .map(Some)
            .map_err(|e| BridgeError::Protocol(format!("unrecognized command received: {}", e)))
    }
}
