//! Application messages and message-type allow-lists

use msgbridge_core::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys an application message may carry
pub const MESSAGE_KEYS: [&str; 3] = ["type", "payload", "meta"];

/// Logical payload carried inside an envelope's `data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    /// Message type used for handler lookup
    #[serde(rename = "type")]
    pub message_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Message {
    /// Create a message without payload or meta
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            payload: None,
            meta: None,
        }
    }

    /// Set the payload
    pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Set the meta information
    pub fn with_meta(mut self, meta: impl Into<Value>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    /// Parse a message from the data of an inbound envelope
    pub fn from_value(value: Value) -> BridgeResult<Self> {
        validate_message(&value)
            .map_err(|reason| BridgeError::Protocol(format!("invalid message: {}", reason)))?;
        serde_json::from_value(value)
            .map_err(|e| BridgeError::Protocol(format!("invalid message: {}", e)))
    }

    /// Convert to the value sent as envelope data
    pub fn to_value(&self) -> BridgeResult<Value> {
        serde_json::to_value(self).map_err(|e| BridgeError::Serialization(e.to_string()))
    }
}

/// Check that `value` is a legal application message
///
/// The value must be an object whose keys are a subset of [`MESSAGE_KEYS`]
/// with a string `type`.
pub fn validate_message(value: &Value) -> Result<(), String> {
    let object = value
        .as_object()
        .ok_or_else(|| "message must be an object".to_string())?;

    if let Some(key) = object.keys().find(|key| !MESSAGE_KEYS.contains(&key.as_str())) {
        return Err(format!("unexpected key '{}'", key));
    }

    match object.get("type") {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err("'type' must be a string".to_string()),
        None => Err("missing 'type'".to_string()),
    }
}

/// Check if `value` is a legal application message
pub fn is_message(value: &Value) -> bool {
    validate_message(value).is_ok()
}

/// Check that a message type name consists of ASCII letters and underscores only
pub fn is_valid_message_type(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic() || c == '_')
}

/// A declared set of message types
///
/// Every type is a valid name (see [`is_valid_message_type`]) and appears
/// only once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageTypes {
    types: Vec<String>,
}

impl MessageTypes {
    /// Build an allow-list, failing with `InvalidArgument` on an invalid or duplicate type
    pub fn new<I, S>(types: I) -> BridgeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut declared: Vec<String> = Vec::new();
        for name in types {
            let name = name.into();
            if !is_valid_message_type(&name) {
                return Err(BridgeError::InvalidArgument(format!(
                    "invalid message type '{}': only letters and underscores are allowed",
                    name
                )));
            }
            if declared.contains(&name) {
                return Err(BridgeError::InvalidArgument(format!(
                    "message type '{}' declared twice",
                    name
                )));
            }
            declared.push(name);
        }
        Ok(Self { types: declared })
    }

    pub fn contains(&self, message_type: &str) -> bool {
        self.types.iter().any(|t| t == message_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Fail with `Protocol` unless `message_type` was declared
    pub(crate) fn require(&self, message_type: &str, direction: &str) -> BridgeResult<()> {
        if self.contains(message_type) {
            Ok(())
        } else {
            Err(BridgeError::Protocol(format!(
                "undeclared {} message type '{}'",
                direction, message_type
            )))
        }
    }
}
