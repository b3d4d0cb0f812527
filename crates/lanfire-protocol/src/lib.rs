//! Wire protocol for Lanfire.
//!
//! This crate defines the closed set of messages that clients and the
//! authoritative server exchange:
//!
//! - **Types** ([`ClientId`], [`ObjectId`], [`Channel`], [`Envelope`],
//!   [`Outbound`]) — identities and the envelope every message travels in.
//! - **Catalog** ([`Message`]) — every message kind, each bound to exactly
//!   one delivery channel.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how envelopes become
//!   bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope<Message>) → Lobby / Session
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{
    ConfirmationType, ErrorType, Key, Message, MouseButton, RoomSummary,
};
pub use types::{Channel, ClientId, Envelope, ObjectId, Outbound};
