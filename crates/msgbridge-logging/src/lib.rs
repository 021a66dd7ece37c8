//! msgbridge-logging - Tracing setup and log forwarding
//!
//! This crate provides:
//! - [`init_logging`] installing a subscriber with a reloadable level
//! - [`BridgeLoggingLayer`] tracing layer handing events to a [`LogForwarder`]
//! - [`LogForwarder`] and [`LogSink`] to ship records to a host, e.g. as `log` messages
//! - [`ReloadHandle`] and [`set_log_level`] for changing the level at runtime

mod forwarder;
mod layer;
mod reload;

pub use forwarder::{INTERNAL_TARGET_PREFIX, LogForwarder, LogSink, log_sink};
pub use layer::{BridgeLoggingLayer, init_logging};
pub use msgbridge_core::LogLevel;
pub use reload::{ReloadHandle, set_log_level};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BridgeLoggingLayer, LogForwarder, LogLevel, LogSink, init_logging, log_sink, set_log_level,
    };
}
