//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating
/// envelopes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed bytes, unknown message type,
    /// missing fields.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope decoded but breaks a protocol rule, e.g. a message
    /// declared on the wrong channel.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
