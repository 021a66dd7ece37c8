//! # msgbridge
//!
//! A transport-agnostic message bridge between two endpoints.
//!
//! msgbridge runs over any asynchronous, order-preserving transport and provides:
//! - A connection state machine with connect retries and remote teardown
//! - Fire-and-forget events and awaited requests with per-request timeouts
//! - Typed routing of application messages to registered handlers
//! - Logging that can be forwarded to the remote side
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! msgbridge = "0.6"
//! ```
//!
//! ## Wiring Two Endpoints
//!
//! ```ignore
//! use msgbridge::prelude::*;
//!
//! let (left, right) = bridge_pair(BridgeOptions::default())?;
//!
//! let server = MessageAppBuilder::new()
//!     .handler("ping", request_handler(|payload| async move {
//!         Ok(json!({ "pong": payload }))
//!     }))
//!     .build(right)?;
//! let client = MessageApp::new(left);
//!
//! let (served, connected) = tokio::join!(server.connect(true, 1), client.connect(false, 1));
//! served?;
//! connected?;
//!
//! let reply = client
//!     .request(&Message::new("ping").with_payload(1), RequestOverrides::none())
//!     .await?;
//! ```
//!
//! ## Writing a Transport Adapter
//!
//! Implement [`TransportAdapter`] for the channel and hand every inbound
//! payload to [`Bridge::receive`] (or to the bridge as an [`InboundSink`]).
//!
//! ## Crate Structure
//!
//! This is a facade crate that re-exports from:
//! - [`msgbridge_core`] - State machine, errors, options and dispatch types
//! - [`msgbridge_transport`] - Envelope, codec and handshake commands
//! - [`msgbridge_runtime`] - The bridge engine and transport adapters
//! - [`msgbridge_app`] - Message routing
//! - [`msgbridge_logging`] - Logging setup and forwarding

// Re-export core types
pub use msgbridge_core::{
    BridgeError, BridgeOptions, BridgeResult, BridgeState, Dispatch, DispatchFn, LogLevel,
    NO_TIMEOUT, Rejection, ReplyFuture, RequestOverrides, dispatch_fn,
};

// Re-export wire types
pub use msgbridge_transport::{
    Codec, CodecError, Command, CommandType, Envelope, JsonCodec, is_envelope, validate_envelope,
};

// Re-export the engine
pub use msgbridge_runtime::{
    Bridge, BridgeFuture, InboundSink, MemoryTransport, MessageBridge, TransportAdapter,
    WeakBridge, bridge_pair,
};

// Re-export routing
pub use msgbridge_app::{
    Handler, HandlerId, HandlerRegistry, LogMessagePayload, Message, MessageApp,
    MessageAppBuilder, MessageTypes, event_handler, handler, log_handler, log_message,
    request_handler,
};

// Re-export logging
pub use msgbridge_logging::{
    BridgeLoggingLayer, LogForwarder, LogSink, init_logging, log_sink, set_log_level,
};

// Re-export common dependencies that adapter and handler authors need
pub use async_trait::async_trait;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;

/// Prelude module for convenient imports.
///
/// Use `use msgbridge::prelude::*;` to import commonly used types.
///
/// This includes:
/// - Engine: `Bridge`, `BridgeOptions`, `RequestOverrides`, `bridge_pair`
/// - Routing: `MessageApp`, `MessageAppBuilder`, `Message` and the handler helpers
/// - Errors: `BridgeError`, `BridgeResult`, `Rejection`
/// - Common deps: `async_trait`, `json!`, `Serialize`, `Deserialize`
pub mod prelude {
    pub use crate::{
        Bridge, BridgeError, BridgeOptions, BridgeResult, BridgeState, Dispatch, Envelope,
        LogLevel, Message, MessageApp, MessageAppBuilder, MessageBridge, Rejection,
        RequestOverrides, TransportAdapter, async_trait, bridge_pair, event_handler, handler,
        request_handler,
    };

    // Serde derives and JSON values (commonly needed for payloads)
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
}
