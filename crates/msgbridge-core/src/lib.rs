//! msgbridge-core - Core types for the msgbridge protocol
//!
//! This crate provides the foundational types shared by the bridge engine
//! and the handler router:
//! - [`BridgeState`] connection state machine
//! - [`BridgeError`] for error handling
//! - [`BridgeOptions`] and [`RequestOverrides`] for configuration
//! - [`Dispatch`], [`Rejection`] and [`DispatchFn`] for inbound dispatch

mod config;
mod dispatch;
mod error;
mod state;

pub use config::{BridgeOptions, NO_TIMEOUT, RequestOverrides};
pub use dispatch::{Dispatch, DispatchFn, Rejection, ReplyFuture, dispatch_fn};
pub use error::{BridgeError, BridgeResult};
pub use state::BridgeState;

use serde::{Deserialize, Serialize};

/// Log levels, serialized as their numeric value
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Off = 5,
}

impl LogLevel {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Off,
        }
    }

    /// Parse a level name such as `"info"` (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "off" => Some(LogLevel::Off),
            _ => None,
        }
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        if value <= LogLevel::Off as u8 {
            Ok(LogLevel::from_u8(value))
        } else {
            Err(format!("invalid log level: {}", value))
        }
    }
}

impl From<LogLevel> for u8 {
    fn from(level: LogLevel) -> Self {
        level as u8
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Off => write!(f, "OFF"),
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BridgeError, BridgeOptions, BridgeResult, BridgeState, Dispatch, DispatchFn, LogLevel,
        NO_TIMEOUT, Rejection, RequestOverrides, dispatch_fn,
    };
}
