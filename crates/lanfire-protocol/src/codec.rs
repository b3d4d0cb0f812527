//! Codec trait and implementations.
//!
//! The codec is constructed once per process and shared by every
//! connection; implementations must therefore be `Send + Sync`.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Channel, Envelope, ProtocolError};

/// Converts values to bytes and back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Decodes an envelope that arrived on `arrived_on` and checks that
    /// both its declared channel and its message kind agree with it.
    ///
    /// # Errors
    /// `Decode` for malformed bytes, `InvalidMessage` for a channel
    /// mismatch.
    fn decode_envelope(
        &self,
        data: &[u8],
        arrived_on: Channel,
    ) -> Result<Envelope, ProtocolError> {
        let envelope: Envelope = self.decode(data)?;
        if !envelope.is_consistent() || envelope.channel != arrived_on {
            return Err(ProtocolError::InvalidMessage(format!(
                "message on {arrived_on} channel declared {} and bound to {}",
                envelope.channel,
                envelope.message.channel()
            )));
        }
        Ok(envelope)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`. Human-readable, which keeps
/// packet captures on the LAN easy to inspect.
///
/// ```rust
/// use lanfire_protocol::{Channel, Codec, Envelope, JsonCodec, Message};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::new(1, 5000, Message::RefreshRooms);
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded = codec.decode_envelope(&bytes, Channel::Reliable).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
