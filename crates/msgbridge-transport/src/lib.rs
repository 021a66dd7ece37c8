//! msgbridge-transport - Wire envelope, validation and codec layer
//!
//! This crate provides:
//! - [`Envelope`] the wire-level message and [`validate_envelope`] its legality check
//! - [`Codec`] trait for encoding/decoding envelopes
//! - [`JsonCodec`] default implementation
//! - [`Command`] handshake framing for transport adapters

mod codec;
mod command;
mod envelope;

pub use codec::{Codec, CodecError, JsonCodec};
pub use command::{COMMAND_PREFIX, Command, CommandType};
pub use envelope::{ENVELOPE_KEYS, Envelope, is_envelope, validate_envelope};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Codec, CodecError, Command, CommandType, Envelope, JsonCodec};
}
