//! Bridge engine: connection lifecycle, envelope pipeline and request correlation

use crate::adapter::{InboundSink, TransportAdapter};
use crate::pending::{PendingReply, PendingTable};
use msgbridge_core::{
    BridgeError, BridgeOptions, BridgeResult, BridgeState, Dispatch, DispatchFn, ReplyFuture,
    RequestOverrides,
};
use msgbridge_transport::{Codec, Envelope, JsonCodec};
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;

/// Data sent back when a handler returned without a reply to a request
const MISSING_REPLY_MESSAGE: &str = "unknown error occurred";

/// Protocol engine connecting two endpoints over a [`TransportAdapter`]
///
/// A bridge owns the connection state machine, allocates request ids, tracks
/// pending requests and runs the encode/decode/validate pipeline. Clones share
/// the same engine.
///
/// `connect`, `disconnect` and `request` do their synchronous part (state
/// checks, id allocation, sending) when called; the returned future only
/// waits for completion. They must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<Inner>,
}

struct Inner {
    adapter: Arc<dyn TransportAdapter>,
    codec: Arc<dyn Codec>,
    options: BridgeOptions,
    request_counter: AtomicU64,
    link: Mutex<Link>,
    pending: Arc<PendingTable>,
}

/// State and installed dispatch function, always changed together
struct Link {
    state: BridgeState,
    handler: Option<DispatchFn>,
    /// Bumped by every connect and teardown; a connect only applies its
    /// outcome while the epoch it started with is current
    epoch: u64,
}

/// Non-owning handle to a [`Bridge`]
///
/// Held by transports that deliver into the bridge they belong to, so the
/// bridge and its adapter can be dropped while delivery is idle.
#[derive(Clone, Default)]
pub struct WeakBridge {
    inner: Weak<Inner>,
}

impl WeakBridge {
    /// Get the bridge back, if it is still alive
    pub fn upgrade(&self) -> Option<Bridge> {
        self.inner.upgrade().map(|inner| Bridge { inner })
    }
}

impl std::fmt::Debug for WeakBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakBridge")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Bridge {
    /// Create a bridge using the default JSON codec
    pub fn new<A: TransportAdapter>(adapter: Arc<A>, options: BridgeOptions) -> BridgeResult<Self> {
        Self::with_codec(adapter, options, JsonCodec::new())
    }

    /// Create a bridge with a custom codec
    pub fn with_codec<A, C>(adapter: Arc<A>, options: BridgeOptions, codec: C) -> BridgeResult<Self>
    where
        A: TransportAdapter,
        C: Codec,
    {
        options.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                adapter,
                codec: Arc::new(codec),
                options,
                request_counter: AtomicU64::new(0),
                link: Mutex::new(Link {
                    state: BridgeState::Disconnected,
                    handler: None,
                    epoch: 0,
                }),
                pending: Arc::new(PendingTable::new()),
            }),
        })
    }

    /// Create a handle that does not keep the bridge alive
    pub fn downgrade(&self) -> WeakBridge {
        WeakBridge {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Get the current connection state
    pub fn state(&self) -> BridgeState {
        self.inner.state()
    }

    /// Check if the bridge is connected
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Check if a connect attempt is in flight
    pub fn is_connecting(&self) -> bool {
        self.state().is_connecting()
    }

    /// Get the options the bridge was created with
    pub fn options(&self) -> &BridgeOptions {
        &self.inner.options
    }

    /// Number of requests still waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    /// Connect, installing `dispatch` for inbound requests and events
    ///
    /// The adapter's `connect` is tried up to `attempts` times. If
    /// [`disconnect`](Self::disconnect) is called while attempts are running,
    /// the connect resolves without entering `Connected`, and its late outcome
    /// never touches a connect started after that disconnect.
    pub fn connect(
        &self,
        dispatch: DispatchFn,
        await_connection: bool,
        attempts: u32,
    ) -> impl Future<Output = BridgeResult<()>> + Send + 'static {
        let started = self.inner.begin_connect(await_connection, attempts);
        let inner = self.inner.clone();
        async move {
            let epoch = started?;
            inner
                .run_connect(dispatch, await_connection, attempts, epoch)
                .await
        }
    }

    /// Disconnect, rejecting every pending request
    pub fn disconnect(&self) -> impl Future<Output = BridgeResult<()>> + Send + 'static {
        let started = self.inner.begin_disconnect();
        let inner = self.inner.clone();
        async move {
            started?;
            let result = inner.adapter.disconnect().await;
            if let Err(err) = &result {
                tracing::warn!(error = %err, "Transport disconnect failed, tearing down anyway");
            }
            inner.teardown();
            result
        }
    }

    /// Send an envelope; requires `Connected`
    pub fn send(&self, envelope: Envelope) -> BridgeResult<()> {
        self.inner.send(&envelope)
    }

    /// Send `data` as a fire-and-forget event
    pub fn emit(&self, data: Value) -> BridgeResult<()> {
        self.send(Envelope::event(data))
    }

    /// Send `data` as a request and wait for the correlated response
    ///
    /// Resolves with the response data, or fails with `Timeout` when the
    /// deadline elapses, `Remote` on an error response, or `Disconnected`
    /// when the bridge disconnects first.
    ///
    /// Dropping the returned future does not cancel the request: its entry
    /// stays pending until the response arrives, the timeout fires or the
    /// bridge disconnects. With [`NO_TIMEOUT`](msgbridge_core::NO_TIMEOUT)
    /// only a response or a disconnect removes it.
    pub fn request(
        &self,
        data: Value,
        overrides: RequestOverrides,
    ) -> impl Future<Output = BridgeResult<Value>> + Send + 'static {
        let started = self.inner.start_request(data, &overrides);
        async move {
            let reply = started?;
            reply.await.unwrap_or_else(|_| {
                Err(BridgeError::Disconnected(
                    "bridge dropped before the request settled".to_string(),
                ))
            })
        }
    }

    /// Process one inbound raw payload
    ///
    /// Responses settle their pending request. Requests and events go to the
    /// installed dispatch function; when a request's handler returns a reply,
    /// the handle of the task sending the response is returned.
    pub fn receive(&self, raw: &str) -> BridgeResult<Option<JoinHandle<()>>> {
        let value = self.inner.codec.decode(raw)?;
        let envelope = Envelope::from_value(value)?;
        let handler = self.inner.installed_handler()?;

        if let Some(reference_id) = envelope.reference_id {
            self.inner.handle_response(reference_id, envelope);
            return Ok(None);
        }

        let request_id = envelope.request_id;
        tracing::debug!(request_id = ?request_id, "Dispatching inbound message");
        let outcome = handler(envelope.data);

        match (request_id, outcome) {
            (Some(id), Ok(Dispatch::Reply(reply))) => Ok(Some(self.respond_async(id, reply))),
            (Some(id), Ok(Dispatch::Handled)) => {
                self.inner
                    .send(&Envelope::error_response(Value::from(MISSING_REPLY_MESSAGE), id))?;
                Err(BridgeError::Handler(format!(
                    "request {} expected a reply but the handler returned none",
                    id
                )))
            }
            (Some(id), Err(err)) => {
                self.inner
                    .send(&Envelope::error_response(Value::from(err.response_message()), id))?;
                Err(BridgeError::Handler(err.to_string()))
            }
            (None, Ok(Dispatch::Reply(reply))) => Ok(Some(tokio::spawn(async move {
                if let Err(rejection) = reply.await {
                    tracing::debug!(%rejection, "Event handler rejected");
                }
            }))),
            (None, Ok(Dispatch::Handled)) => Ok(None),
            (None, Err(err)) => {
                // Nobody waits on an event; report instead of failing the transport
                tracing::error!(error = %err, "Event handler failed");
                Ok(None)
            }
        }
    }

    /// Tear down after the remote side closed the channel
    ///
    /// Does not call the adapter. No-op when already disconnected.
    pub fn handle_remote_disconnect(&self) {
        if self.state() == BridgeState::Disconnected {
            return;
        }
        tracing::info!("Remote side disconnected");
        self.inner.teardown();
    }

    fn respond_async(&self, request_id: u64, reply: ReplyFuture) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let envelope = match reply.await {
                Ok(data) => Envelope::response(data, request_id),
                Err(rejection) => Envelope::error_response(rejection.into_value(), request_id),
            };
            if let Err(err) = inner.send(&envelope) {
                tracing::warn!(request_id, error = %err, "Failed to send response");
            }
        })
    }
}

impl InboundSink for Bridge {
    fn receive_raw(&self, raw: &str) -> BridgeResult<()> {
        self.receive(raw).map(|_| ())
    }

    fn remote_disconnected(&self) {
        self.handle_remote_disconnect();
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("state", &self.state())
            .field("pending_requests", &self.pending_requests())
            .finish()
    }
}

impl Inner {
    fn state(&self) -> BridgeState {
        self.link.lock().state
    }

    fn next_request_id(&self) -> u64 {
        self.request_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn transition(link: &mut Link, target: BridgeState) -> BridgeResult<()> {
        if !link.state.can_transition_to(target) {
            return Err(BridgeError::InvalidState {
                expected: format!("state that can transition to {}", target),
                actual: link.state.to_string(),
            });
        }
        tracing::debug!(from = %link.state, to = %target, "Bridge state transition");
        link.state = target;
        Ok(())
    }

    fn begin_connect(&self, await_connection: bool, attempts: u32) -> BridgeResult<u64> {
        if attempts == 0 {
            return Err(BridgeError::InvalidArgument(
                "connect attempts must be at least 1".to_string(),
            ));
        }
        let mut link = self.link.lock();
        if link.state != BridgeState::Disconnected {
            return Err(BridgeError::InvalidState {
                expected: BridgeState::Disconnected.to_string(),
                actual: link.state.to_string(),
            });
        }
        let target = if await_connection {
            BridgeState::AwaitingConnect
        } else {
            BridgeState::Connecting
        };
        Self::transition(&mut link, target)?;
        link.epoch += 1;
        Ok(link.epoch)
    }

    /// Check that the connect started at `epoch` still owns the link
    fn owns_link(link: &Link, epoch: u64) -> bool {
        link.epoch == epoch && link.state.is_connecting()
    }

    async fn run_connect(
        &self,
        dispatch: DispatchFn,
        await_connection: bool,
        attempts: u32,
        epoch: u64,
    ) -> BridgeResult<()> {
        let mut attempt = 1;
        loop {
            if !Self::owns_link(&self.link.lock(), epoch) {
                tracing::debug!("Connect superseded before attempt {}", attempt);
                return Ok(());
            }

            match self.adapter.connect(await_connection).await {
                Ok(()) => break,
                Err(err) if attempt < attempts => {
                    tracing::warn!(attempt, attempts, error = %err, "Connect attempt failed, retrying");
                    attempt += 1;
                    let delay = self.options.connect_retry_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => {
                    tracing::warn!(attempts, error = %err, "Connect failed");
                    let mut link = self.link.lock();
                    if Self::owns_link(&link, epoch) {
                        link.handler = None;
                        link.state = BridgeState::Disconnected;
                    }
                    return Err(err);
                }
            }
        }

        {
            let mut link = self.link.lock();
            if !Self::owns_link(&link, epoch) {
                // disconnect was called while connecting; it wins
                tracing::debug!(state = %link.state, "Connect finished after disconnect");
                return Ok(());
            }
            link.handler = Some(dispatch);
            Self::transition(&mut link, BridgeState::Connected)?;
        }

        self.adapter.connected();
        tracing::info!("Bridge connected");
        Ok(())
    }

    fn begin_disconnect(&self) -> BridgeResult<()> {
        let mut link = self.link.lock();
        Self::transition(&mut link, BridgeState::Disconnecting)?;
        link.epoch += 1;
        Ok(())
    }

    fn teardown(&self) {
        {
            let mut link = self.link.lock();
            link.epoch += 1;
            link.handler = None;
            if link.state != BridgeState::Disconnected {
                link.state = BridgeState::Disconnected;
            }
        }
        let cancelled = self
            .pending
            .reject_all(&BridgeError::Disconnected("disconnect".to_string()));
        tracing::info!(cancelled, "Bridge disconnected");
    }

    fn installed_handler(&self) -> BridgeResult<DispatchFn> {
        let link = self.link.lock();
        if !link.state.is_connected() {
            return Err(BridgeError::Disconnected(format!(
                "cannot receive in state {}",
                link.state
            )));
        }
        link.handler
            .clone()
            .ok_or_else(|| BridgeError::Disconnected("no handler installed".to_string()))
    }

    fn send(&self, envelope: &Envelope) -> BridgeResult<()> {
        let state = self.state();
        if !state.is_connected() {
            return Err(BridgeError::Disconnected(format!(
                "bridge is not connected (state: {})",
                state
            )));
        }
        let raw = self.codec.encode(envelope)?;
        tracing::trace!(bytes = raw.len(), "Sending envelope");
        self.adapter.send(raw)
    }

    fn start_request(&self, data: Value, overrides: &RequestOverrides) -> BridgeResult<PendingReply> {
        let options = self.options.merged(overrides)?;
        let state = self.state();
        if !state.is_connected() {
            return Err(BridgeError::Disconnected(format!(
                "cannot request in state {}",
                state
            )));
        }

        let request_id = self.next_request_id();
        let raw = self.codec.encode(&Envelope::request(data, request_id))?;
        let reply = self.pending.register(request_id);

        if let Some(timeout) = options.timeout() {
            let pending: Weak<PendingTable> = Arc::downgrade(&self.pending);
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            let timer = tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if let Some(pending) = pending.upgrade() {
                    if pending.settle(request_id, Err(BridgeError::Timeout { request_id, timeout_ms })) {
                        tracing::debug!(request_id, timeout_ms, "Request timed out");
                    }
                }
            });
            self.pending.arm(request_id, timer.abort_handle());
        }

        tracing::debug!(request_id, "Sending request");
        if let Err(err) = self.adapter.send(raw) {
            self.pending.settle(request_id, Err(err.clone()));
            return Err(err);
        }
        Ok(reply)
    }

    fn handle_response(&self, reference_id: u64, envelope: Envelope) {
        let result = if envelope.is_error_response() {
            Err(BridgeError::Remote(envelope.data))
        } else {
            Ok(envelope.data)
        };

        if self.pending.settle(reference_id, result) {
            tracing::debug!(reference_id, "Response settled request");
        } else if reference_id >= self.request_counter.load(Ordering::SeqCst) {
            tracing::warn!(reference_id, "Dropping response to a request this bridge never issued");
        } else {
            tracing::debug!(reference_id, "Dropping response to an expired request");
        }
    }
}

#[cfg(test)]
#[path = "bridge/bridge_tests.rs"]
mod bridge_tests;
