//! In-process transport adapter pair

use crate::adapter::{InboundSink, TransportAdapter};
use crate::bridge::{Bridge, WeakBridge};
use async_trait::async_trait;
use msgbridge_core::{BridgeError, BridgeOptions, BridgeResult};
use msgbridge_transport::{Command, CommandType};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Default bound on waiting for the remote side during `connect`
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// One end of an in-process, order-preserving channel
///
/// Created in connected pairs with [`MemoryTransport::pair`]. Connecting uses
/// the handshake commands: the initiating end sends `CONNECT` and waits for
/// `CONNECT_SUCCESS`; the awaiting end answers once its bridge is connected.
/// Inbound payloads are pumped to the bridge given to [`bind`](Self::bind).
pub struct MemoryTransport {
    outbound: mpsc::UnboundedSender<String>,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    handshake: Arc<Mutex<Handshake>>,
    connect_timeout: Duration,
}

/// Handshake progress shared between a transport and its pump
#[derive(Default)]
struct Handshake {
    waiter: Option<Waiter>,
    /// A `CONNECT` was accepted and `CONNECT_SUCCESS` is owed once connected
    ack_pending: bool,
    /// A `CONNECT` arrived before the local side started awaiting it
    early_connect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectMode {
    Initiating,
    Awaiting,
}

struct Waiter {
    mode: ConnectMode,
    resolve: oneshot::Sender<()>,
}

impl MemoryTransport {
    /// Create two transports wired to each other
    pub fn pair() -> (Self, Self) {
        Self::pair_with_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a pair with a custom connect timeout
    pub fn pair_with_timeout(connect_timeout: Duration) -> (Self, Self) {
        let (left_tx, right_rx) = mpsc::unbounded_channel();
        let (right_tx, left_rx) = mpsc::unbounded_channel();
        (
            Self::new(left_tx, left_rx, connect_timeout),
            Self::new(right_tx, right_rx, connect_timeout),
        )
    }

    fn new(
        outbound: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            outbound,
            inbound: Mutex::new(Some(inbound)),
            handshake: Arc::new(Mutex::new(Handshake::default())),
            connect_timeout,
        }
    }

    /// Start delivering inbound payloads to `bridge`
    ///
    /// Payloads are delivered one at a time, in arrival order. Can only be
    /// called once per transport. The delivery task holds the bridge weakly
    /// and stops once the channel closes, which happens when the peer
    /// transport is dropped, or when the bridge is gone.
    pub fn bind(&self, bridge: &Bridge) -> BridgeResult<JoinHandle<()>> {
        let inbound = self.inbound.lock().take().ok_or_else(|| {
            BridgeError::InvalidState {
                expected: "unbound transport".to_string(),
                actual: "already bound".to_string(),
            }
        })?;
        let pump = Pump {
            bridge: bridge.downgrade(),
            handshake: self.handshake.clone(),
        };
        Ok(tokio::spawn(pump.run(inbound)))
    }

    fn send_command(&self, command_type: CommandType) -> BridgeResult<()> {
        send_command(&self.outbound, command_type)
    }
}

#[async_trait]
impl TransportAdapter for MemoryTransport {
    async fn connect(&self, await_connect: bool) -> BridgeResult<()> {
        let (resolve, resolved) = oneshot::channel();
        {
            let mut handshake = self.handshake.lock();
            if await_connect && std::mem::take(&mut handshake.early_connect) {
                handshake.ack_pending = true;
                return Ok(());
            }
            let mode = if await_connect {
                ConnectMode::Awaiting
            } else {
                ConnectMode::Initiating
            };
            handshake.waiter = Some(Waiter { mode, resolve });
        }

        if !await_connect {
            self.send_command(CommandType::Connect)?;
        }

        match tokio::time::timeout(self.connect_timeout, resolved).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(BridgeError::Transport("connect superseded".to_string())),
            Err(_) => {
                self.handshake.lock().waiter = None;
                Err(BridgeError::Transport("connection timeout".to_string()))
            }
        }
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        *self.handshake.lock() = Handshake::default();
        if let Err(err) = self.send_command(CommandType::Disconnect) {
            // Peer already gone; nothing left to tell it
            tracing::debug!(error = %err, "Could not deliver disconnect command");
        }
        Ok(())
    }

    fn send(&self, raw: String) -> BridgeResult<()> {
        self.outbound
            .send(raw)
            .map_err(|_| BridgeError::Transport("peer transport dropped".to_string()))
    }

    fn connected(&self) {
        let ack = std::mem::take(&mut self.handshake.lock().ack_pending);
        if ack {
            if let Err(err) = self.send_command(CommandType::ConnectSuccess) {
                tracing::warn!(error = %err, "Could not acknowledge connect");
            }
        }
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("bound", &self.inbound.lock().is_none())
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

fn send_command(
    outbound: &mpsc::UnboundedSender<String>,
    command_type: CommandType,
) -> BridgeResult<()> {
    let raw = Command::new(command_type).encode()?;
    outbound
        .send(raw)
        .map_err(|_| BridgeError::Transport("peer transport dropped".to_string()))
}

/// Inbound delivery loop of one transport
struct Pump {
    bridge: WeakBridge,
    handshake: Arc<Mutex<Handshake>>,
}

impl Pump {
    async fn run(self, mut inbound: mpsc::UnboundedReceiver<String>) {
        while let Some(raw) = inbound.recv().await {
            let Some(bridge) = self.bridge.upgrade() else {
                tracing::debug!("Bridge dropped, stopping memory transport delivery");
                return;
            };
            match Command::try_decode(&raw) {
                Ok(Some(command)) => self.handle_command(&bridge, command.command_type),
                Ok(None) => {
                    if let Err(err) = bridge.receive_raw(&raw) {
                        tracing::warn!(error = %err, "Inbound message rejected");
                    }
                }
                Err(err) => tracing::warn!(error = %err, "Inbound command rejected"),
            }
        }
        tracing::debug!("Memory transport channel closed");
    }

    fn handle_command(&self, bridge: &Bridge, command_type: CommandType) {
        match command_type {
            CommandType::Connect => {
                let mut handshake = self.handshake.lock();
                match Self::take_waiter(&mut handshake, ConnectMode::Awaiting) {
                    Some(resolve) => {
                        handshake.ack_pending = true;
                        let _ = resolve.send(());
                    }
                    None => {
                        tracing::debug!("Connect command arrived before the local side awaited it");
                        handshake.early_connect = true;
                    }
                }
            }
            CommandType::ConnectSuccess => {
                let waiter = Self::take_waiter(&mut self.handshake.lock(), ConnectMode::Initiating);
                if let Some(resolve) = waiter {
                    let _ = resolve.send(());
                } else {
                    tracing::debug!("Ignoring connect success: no connect in flight");
                }
            }
            CommandType::Disconnect => {
                *self.handshake.lock() = Handshake::default();
                bridge.remote_disconnected();
            }
        }
    }

    fn take_waiter(handshake: &mut Handshake, mode: ConnectMode) -> Option<oneshot::Sender<()>> {
        if handshake.waiter.as_ref().map(|w| w.mode) == Some(mode) {
            handshake.waiter.take().map(|w| w.resolve)
        } else {
            None
        }
    }
}

/// Create two bridges wired to each other over a [`MemoryTransport`] pair
pub fn bridge_pair(options: BridgeOptions) -> BridgeResult<(Bridge, Bridge)> {
    let (left, right) = MemoryTransport::pair();
    let (left, right) = (Arc::new(left), Arc::new(right));
    let left_bridge = Bridge::new(left.clone(), options.clone())?;
    let right_bridge = Bridge::new(right.clone(), options)?;
    left.bind(&left_bridge)?;
    right.bind(&right_bridge)?;
    Ok((left_bridge, right_bridge))
}
