//! Wire envelope and its structural validator

use msgbridge_core::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys a wire envelope may carry
pub const ENVELOPE_KEYS: [&str; 4] = ["data", "requestId", "referenceId", "isError"];

/// The wire-level unit exchanged between two bridges
///
/// An envelope without `reference_id` is a request (when `request_id` is set)
/// or a fire-and-forget event. An envelope with `reference_id` is the response
/// to the request carrying that id; `is_error` marks it as a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Envelope {
    /// Carried payload
    pub data: Value,

    /// Set when the sender expects a response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,

    /// Set on responses: the `request_id` being answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<u64>,

    /// Marks a response as an error response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl Envelope {
    /// Create a fire-and-forget envelope
    pub fn event(data: Value) -> Self {
        Self {
            data,
            request_id: None,
            reference_id: None,
            is_error: None,
        }
    }

    /// Create a request envelope expecting a response
    pub fn request(data: Value, request_id: u64) -> Self {
        Self {
            request_id: Some(request_id),
            ..Self::event(data)
        }
    }

    /// Create a success response to `reference_id`
    pub fn response(data: Value, reference_id: u64) -> Self {
        Self {
            reference_id: Some(reference_id),
            ..Self::event(data)
        }
    }

    /// Create an error response to `reference_id`
    pub fn error_response(data: Value, reference_id: u64) -> Self {
        Self {
            reference_id: Some(reference_id),
            is_error: Some(true),
            ..Self::event(data)
        }
    }

    /// Check if this envelope answers a request
    pub fn is_response(&self) -> bool {
        self.reference_id.is_some()
    }

    /// Check if this envelope is an error response
    pub fn is_error_response(&self) -> bool {
        self.is_response() && self.is_error == Some(true)
    }

    /// Check if the sender waits for a response
    pub fn expects_response(&self) -> bool {
        !self.is_response() && self.request_id.is_some()
    }

    /// Validate a decoded value and convert it into an envelope
    pub fn from_value(value: Value) -> BridgeResult<Self> {
        validate_envelope(&value).map_err(BridgeError::Protocol)?;
        serde_json::from_value(value).map_err(|e| BridgeError::Protocol(e.to_string()))
    }

    /// Convert into a JSON value
    pub fn to_value(&self) -> BridgeResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Check that a decoded value is a legal envelope
///
/// The value must be an object whose keys are a subset of [`ENVELOPE_KEYS`],
/// with `data` present, `requestId`/`referenceId` non-negative integers and
/// `isError` a boolean when present. `null` does not count as absent.
pub fn validate_envelope(value: &Value) -> Result<(), String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "envelope must be an object".to_string())?;

    if let Some(key) = obj.keys().find(|k| !ENVELOPE_KEYS.contains(&k.as_str())) {
        return Err(format!("unexpected envelope key: {}", key));
    }

    if !obj.contains_key("data") {
        return Err("envelope is missing data".to_string());
    }

    for key in ["requestId", "referenceId"] {
        if let Some(id) = obj.get(key) {
            if id.as_u64().is_none() {
                return Err(format!("{} must be a non-negative integer, got {}", key, id));
            }
        }
    }

    if let Some(flag) = obj.get("isError") {
        if !flag.is_boolean() {
            return Err(format!("isError must be a boolean, got {}", flag));
        }
    }

    Ok(())
}

/// Check whether a decoded value is a legal envelope
pub fn is_envelope(value: &Value) -> bool {
    validate_envelope(value).is_ok()
}
