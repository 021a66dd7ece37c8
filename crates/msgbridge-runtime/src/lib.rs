//! msgbridge-runtime - Tokio bridge engine
//!
//! This crate provides:
//! - [`Bridge`], the protocol engine: connection lifecycle, request ids,
//!   pending-request correlation with timeouts, envelope encode/validate
//! - [`TransportAdapter`] and [`InboundSink`], the contract with the physical channel
//! - [`MessageBridge`], the capability contract routers build on
//! - [`MemoryTransport`] and [`bridge_pair`] for in-process channels

mod adapter;
mod bridge;
mod capability;
mod memory;
mod pending;

pub use adapter::{InboundSink, TransportAdapter};
pub use bridge::{Bridge, WeakBridge};
pub use capability::{BridgeFuture, MessageBridge};
pub use memory::{DEFAULT_CONNECT_TIMEOUT, MemoryTransport, bridge_pair};

// Re-exported for adapter implementors
pub use async_trait::async_trait;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Bridge, BridgeFuture, InboundSink, MemoryTransport, MessageBridge, TransportAdapter,
        async_trait, bridge_pair,
    };
}
