//! Message router on top of a bridge engine

use crate::message::{Message, MessageTypes};
use crate::registry::{Handler, HandlerId, HandlerRegistry};
use msgbridge_core::{
    BridgeError, BridgeResult, Dispatch, ReplyFuture, RequestOverrides, dispatch_fn,
};
use msgbridge_runtime::{Bridge, BridgeFuture, MessageBridge};
use msgbridge_transport::Envelope;
use parking_lot::RwLock;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Routes application messages to handlers registered by message type
///
/// The app owns a [`MessageBridge`] and installs its own dispatch function
/// when connecting. Several handlers may be registered for one type; all of
/// them run, in registration order, and the first one returning a reply
/// answers the request.
///
/// # Example
///
/// ```ignore
/// let app = MessageAppBuilder::new()
///     .handler("ping", request_handler(|_| async { Ok(json!("pong")) }))
///     .build(bridge)?;
/// app.connect(true, 1).await?;
/// ```
pub struct MessageApp<B: MessageBridge = Bridge> {
    bridge: B,
    router: Arc<Router>,
    outgoing: Option<MessageTypes>,
}

/// State shared with the dispatch function installed on the bridge
struct Router {
    registry: RwLock<HandlerRegistry>,
    incoming: Option<MessageTypes>,
}

impl<B: MessageBridge> MessageApp<B> {
    /// Create an app without handlers or allow-lists
    pub fn new(bridge: B) -> Self {
        Self {
            bridge,
            router: Arc::new(Router {
                registry: RwLock::new(HandlerRegistry::new()),
                incoming: None,
            }),
            outgoing: None,
        }
    }

    /// Get the underlying bridge
    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn is_connected(&self) -> bool {
        self.bridge.is_connected()
    }

    pub fn is_connecting(&self) -> bool {
        self.bridge.is_connecting()
    }

    /// Register a handler for `message_type`
    ///
    /// With an incoming allow-list, undeclared types fail with `Protocol`.
    pub fn on(&self, message_type: impl Into<String>, handler: Handler) -> BridgeResult<HandlerId> {
        let message_type = message_type.into();
        if let Some(incoming) = &self.router.incoming {
            incoming.require(&message_type, "incoming")?;
        }
        let id = self.router.registry.write().register(message_type.as_str(), handler);
        tracing::debug!(%message_type, handler = %id, "Handler registered");
        Ok(id)
    }

    /// Remove a registration; returns false if it was not registered
    pub fn off(&self, id: HandlerId) -> bool {
        self.router.registry.write().remove(id)
    }

    /// Connect the bridge with this app as its dispatch function
    pub fn connect(&self, await_connection: bool, attempts: u32) -> BridgeFuture<()> {
        let router = self.router.clone();
        let dispatch = dispatch_fn(move |data| router.receive(data));
        self.bridge.connect(dispatch, await_connection, attempts)
    }

    pub fn disconnect(&self) -> BridgeFuture<()> {
        self.bridge.disconnect()
    }

    /// Send a one-way message
    pub fn emit(&self, message: &Message) -> BridgeResult<()> {
        let data = self.outbound(message)?;
        self.bridge.send(Envelope::event(data))
    }

    /// Send a request message and wait for the response data
    pub fn request(
        &self,
        message: &Message,
        overrides: RequestOverrides,
    ) -> impl Future<Output = BridgeResult<Value>> + Send + 'static {
        let pending = self
            .outbound(message)
            .map(|data| self.bridge.request(data, overrides));
        async move { pending?.await }
    }

    /// Dispatch the data of one inbound envelope to the registered handlers
    ///
    /// This is the function the bridge invokes once connected.
    pub fn receive(&self, data: Value) -> BridgeResult<Dispatch> {
        self.router.receive(data)
    }

    fn outbound(&self, message: &Message) -> BridgeResult<Value> {
        if let Some(outgoing) = &self.outgoing {
            outgoing.require(&message.message_type, "outgoing")?;
        }
        message.to_value()
    }
}

impl<B: MessageBridge> std::fmt::Debug for MessageApp<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageApp")
            .field("connected", &self.is_connected())
            .field("registry", &*self.router.registry.read())
            .field("incoming", &self.router.incoming)
            .field("outgoing", &self.outgoing)
            .finish()
    }
}

impl Router {
    fn receive(&self, data: Value) -> BridgeResult<Dispatch> {
        let message = Message::from_value(data)?;
        // Snapshot so handlers may call `on`/`off` without deadlocking
        let handlers = self.registry.read().handlers_for(&message.message_type);
        if handlers.is_empty() {
            tracing::debug!(message_type = %message.message_type, "No handler registered");
            return Ok(Dispatch::Handled);
        }

        let mut response: Option<ReplyFuture> = None;
        for handler in handlers {
            match handler(message.payload.clone())? {
                Dispatch::Handled => {}
                Dispatch::Reply(reply) if response.is_none() => response = Some(reply),
                Dispatch::Reply(reply) => {
                    let message_type = message.message_type.clone();
                    tokio::spawn(async move {
                        if let Err(rejection) = reply.await {
                            tracing::debug!(%message_type, %rejection, "Secondary handler rejected");
                        }
                    });
                }
            }
        }
        Ok(response.map_or(Dispatch::Handled, Dispatch::Reply))
    }
}

/// Builder for [`MessageApp`]
#[derive(Default)]
pub struct MessageAppBuilder {
    handlers: Vec<(String, Handler)>,
    incoming: Option<Vec<String>>,
    outgoing: Option<Vec<String>>,
}

impl MessageAppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `message_type`
    pub fn handler(mut self, message_type: impl Into<String>, handler: Handler) -> Self {
        self.handlers.push((message_type.into(), handler));
        self
    }

    /// Declare the message types this app accepts handlers for
    pub fn incoming_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.incoming = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Declare the message types this app may send
    pub fn outgoing_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outgoing = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Build the app on top of `bridge`
    ///
    /// Fails with `InvalidArgument` when an allow-list is invalid or a
    /// handler is registered for a type missing from the incoming list.
    pub fn build<B: MessageBridge>(self, bridge: B) -> BridgeResult<MessageApp<B>> {
        let incoming = self.incoming.map(MessageTypes::new).transpose()?;
        let outgoing = self.outgoing.map(MessageTypes::new).transpose()?;

        let mut registry = HandlerRegistry::new();
        for (message_type, handler) in self.handlers {
            if let Some(incoming) = &incoming {
                if !incoming.contains(&message_type) {
                    return Err(BridgeError::InvalidArgument(format!(
                        "handler registered for undeclared message type '{}'",
                        message_type
                    )));
                }
            }
            registry.register(message_type, handler);
        }

        Ok(MessageApp {
            bridge,
            router: Arc::new(Router {
                registry: RwLock::new(registry),
                incoming,
            }),
            outgoing,
        })
    }
}

impl std::fmt::Debug for MessageAppBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types: Vec<&str> = self.handlers.iter().map(|(t, _)| t.as_str()).collect();
        f.debug_struct("MessageAppBuilder")
            .field("handlers", &types)
            .field("incoming", &self.incoming)
            .field("outgoing", &self.outgoing)
            .finish()
    }
}
