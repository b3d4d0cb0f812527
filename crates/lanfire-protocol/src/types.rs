//! Identity, channel, and envelope types shared by every Lanfire layer.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::Message;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A connected client, assigned by the server when the reliable
/// connection is accepted.
///
/// Serialized as a plain number (`#[serde(transparent)]`) so the same
/// value can be used as the prefix of unreliable datagrams.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// The network identity of a simulated object (player or projectile).
///
/// Allocated by the server session, unique among live objects of one
/// match. Clients never invent these; their local predictions carry
/// no `ObjectId` at all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Channel — delivery guarantees
// ---------------------------------------------------------------------------

/// The delivery guarantee a message travels with.
///
/// Every [`Message`] kind is bound to exactly one channel; see
/// [`Message::channel`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "PascalCase")]
pub enum Channel {
    /// Delivered in order, no loss (TCP). Lobby control, lifecycle,
    /// key and button input.
    #[default]
    Reliable,

    /// May be lost or reordered (UDP). Per-tick state and mouse motion,
    /// where only the latest value matters.
    Unreliable,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reliable => write!(f, "reliable"),
            Self::Unreliable => write!(f, "unreliable"),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope — the top-level wire format
// ---------------------------------------------------------------------------

/// Every message on the wire is wrapped in an `Envelope`.
///
/// ```text
/// ┌──────────────────────────────┐
/// │ seq: 42                      │  ← per-sender counter
/// │ timestamp: 15000             │  ← ms since sender start
/// │ channel: Unreliable          │  ← must match the message kind
/// │ message: UpdatePlayer {..}   │
/// └──────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Auto-incrementing sequence number, one counter per sender.
    pub seq: u64,

    /// Milliseconds since the sender started.
    pub timestamp: u64,

    /// The channel this envelope claims to travel on.
    #[serde(default)]
    pub channel: Channel,

    /// The message itself.
    pub message: Message,
}

impl Envelope {
    /// Wraps a message, stamping the channel its kind is bound to.
    pub fn new(seq: u64, timestamp: u64, message: Message) -> Self {
        Self {
            seq,
            timestamp,
            channel: message.channel(),
            message,
        }
    }

    /// Returns `true` when the declared channel matches the channel the
    /// message kind is bound to. Receivers drop inconsistent envelopes.
    pub fn is_consistent(&self) -> bool {
        self.channel == self.message.channel()
    }
}

// ---------------------------------------------------------------------------
// Outbound — addressed server messages
// ---------------------------------------------------------------------------

/// A server message addressed to one client.
///
/// Lobby and session logic return these instead of writing to sockets,
/// so they stay synchronous and testable; the server routes them onto
/// the right connection and channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    /// Recipient.
    pub to: ClientId,
    /// Payload.
    pub message: Message,
}

impl Outbound {
    /// Addresses `message` to `to`.
    pub fn new(to: ClientId, message: Message) -> Self {
        Self { to, message }
    }

    /// Addresses a copy of `message` to every client in `to`.
    pub fn broadcast<'a>(
        to: impl IntoIterator<Item = &'a ClientId>,
        message: &Message,
    ) -> Vec<Self> {
        to.into_iter()
            .map(|&client| Self::new(client, message.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ClientId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(ClientId(7).to_string(), "C-7");
        assert_eq!(ObjectId(3).to_string(), "#3");
    }

    #[test]
    fn test_channel_serializes_as_pascal_case() {
        let json = serde_json::to_string(&Channel::Unreliable).unwrap();
        assert_eq!(json, "\"Unreliable\"");
        assert_eq!(Channel::default(), Channel::Reliable);
    }

    #[test]
    fn test_envelope_new_stamps_message_channel() {
        let env = Envelope::new(
            1,
            10,
            Message::UpdateProjectile {
                id: ObjectId(9),
                x: 1.0,
                y: 2.0,
                rotation: 0.0,
            },
        );
        assert_eq!(env.channel, Channel::Unreliable);
        assert!(env.is_consistent());
    }

    #[test]
    fn test_envelope_with_wrong_channel_is_inconsistent() {
        let mut env = Envelope::new(1, 10, Message::StartGame);
        env.channel = Channel::Unreliable;
        assert!(!env.is_consistent());
    }

    #[test]
    fn test_envelope_channel_defaults_when_missing() {
        let json = r#"{
            "seq": 1,
            "timestamp": 100,
            "message": { "type": "RefreshRooms" }
        }"#;
        let env: Envelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.channel, Channel::Reliable);
        assert!(env.is_consistent());
    }

    #[test]
    fn test_outbound_broadcast_addresses_each_client() {
        let clients = [ClientId(1), ClientId(2), ClientId(3)];
        let out = Outbound::broadcast(&clients, &Message::StartGame);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].to, ClientId(3));
        assert!(out.iter().all(|o| o.message == Message::StartGame));
    }
}
