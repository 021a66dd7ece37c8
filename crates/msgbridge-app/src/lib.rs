//! msgbridge-app - Typed message routing
//!
//! This crate provides:
//! - [`Message`] application messages and their validation
//! - [`MessageTypes`] incoming/outgoing allow-lists
//! - [`HandlerRegistry`] with [`handler`], [`event_handler`] and [`request_handler`]
//! - [`MessageApp`], the router that connects a bridge with its own dispatch function
//! - The built-in `log` message ([`LogMessagePayload`])

mod app;
mod message;
mod messages;
mod registry;

pub use app::{MessageApp, MessageAppBuilder};
pub use message::{
    MESSAGE_KEYS, Message, MessageTypes, is_message, is_valid_message_type, validate_message,
};
pub use messages::{LOG_MESSAGE_TYPE, LogMessagePayload, log_handler, log_message};
pub use registry::{Handler, HandlerId, HandlerRegistry, event_handler, handler, request_handler};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Handler, HandlerId, LogMessagePayload, Message, MessageApp, MessageAppBuilder,
        MessageTypes, event_handler, handler, log_handler, log_message, request_handler,
    };
}
