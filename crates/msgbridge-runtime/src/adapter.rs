//! Transport adapter contract

use async_trait::async_trait;
use msgbridge_core::BridgeResult;

/// The physical channel a bridge rides on
///
/// Implementations move already-encoded envelopes across their boundary and
/// hand every inbound payload to an [`InboundSink`], in arrival order.
///
/// # Example
///
/// ```ignore
/// struct SocketAdapter { /* ... */ }
///
/// #[async_trait]
/// impl TransportAdapter for SocketAdapter {
///     async fn connect(&self, await_connect: bool) -> BridgeResult<()> {
///         self.open(await_connect).await
///     }
///
///     async fn disconnect(&self) -> BridgeResult<()> {
///         self.close().await
///     }
///
///     fn send(&self, raw: String) -> BridgeResult<()> {
///         self.write_frame(raw)
///     }
/// }
/// ```
#[async_trait]
pub trait TransportAdapter: Send + Sync + 'static {
    /// Establish the channel
    ///
    /// With `await_connect` the remote side is expected to initiate. May be
    /// called several times when the bridge retries a failed attempt.
    async fn connect(&self, await_connect: bool) -> BridgeResult<()>;

    /// Tear the channel down
    async fn disconnect(&self) -> BridgeResult<()>;

    /// Push one encoded envelope; no acknowledgment is expected
    fn send(&self, raw: String) -> BridgeResult<()>;

    /// Called once the bridge has installed its dispatch function and is `Connected`
    fn connected(&self) {}
}

/// Receiving end of a transport adapter
///
/// Implemented by the bridge; adapters call it for every inbound payload.
pub trait InboundSink: Send + Sync + 'static {
    /// Process one inbound raw payload
    fn receive_raw(&self, raw: &str) -> BridgeResult<()>;

    /// The remote side tore the channel down
    fn remote_disconnected(&self);
}
