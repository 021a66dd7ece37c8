//! Capability contract a handler router needs from its engine

use crate::Bridge;
use msgbridge_core::{BridgeResult, DispatchFn, RequestOverrides};
use msgbridge_transport::Envelope;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`MessageBridge`] operations
pub type BridgeFuture<T> = Pin<Box<dyn Future<Output = BridgeResult<T>> + Send + 'static>>;

/// What a transport-bound engine must offer to carry application messages
///
/// [`Bridge`] is the canonical implementation; routers are generic over this
/// trait so alternative engines (or test doubles) can stand in.
pub trait MessageBridge: Send + Sync + 'static {
    /// Check if the engine is connected
    fn is_connected(&self) -> bool;

    /// Check if a connect attempt is in flight
    fn is_connecting(&self) -> bool;

    /// Connect, installing `dispatch` for inbound requests and events
    fn connect(&self, dispatch: DispatchFn, await_connection: bool, attempts: u32)
    -> BridgeFuture<()>;

    /// Disconnect, cancelling outstanding requests
    fn disconnect(&self) -> BridgeFuture<()>;

    /// Send one envelope without waiting for a response
    fn send(&self, envelope: Envelope) -> BridgeResult<()>;

    /// Send `data` as a request and wait for the response
    fn request(&self, data: Value, overrides: RequestOverrides) -> BridgeFuture<Value>;
}

impl MessageBridge for Bridge {
    fn is_connected(&self) -> bool {
        Bridge::is_connected(self)
    }

    fn is_connecting(&self) -> bool {
        Bridge::is_connecting(self)
    }

    fn connect(
        &self,
        dispatch: DispatchFn,
        await_connection: bool,
        attempts: u32,
    ) -> BridgeFuture<()> {
        Box::pin(Bridge::connect(self, dispatch, await_connection, attempts))
    }

    fn disconnect(&self) -> BridgeFuture<()> {
        Box::pin(Bridge::disconnect(self))
    }

    fn send(&self, envelope: Envelope) -> BridgeResult<()> {
        Bridge::send(self, envelope)
    }

    fn request(&self, data: Value, overrides: RequestOverrides) -> BridgeFuture<Value> {
        Box::pin(Bridge::request(self, data, overrides))
    }
}
