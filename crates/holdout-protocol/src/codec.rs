//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The server never calls `serde_json` directly: it holds something that
//! implements [`Codec`] and encodes every outbound [`Envelope`](crate::Envelope)
//! through it. [`JsonCodec`] is the only implementation today.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Browser clients read the frames as text, so every event and reply stays
/// inspectable in DevTools.
///
/// ## Example
///
/// ```rust
/// use holdout_protocol::{
///     Codec, Envelope, GameEvent, JsonCodec, ServerMessage, SessionId,
/// };
///
/// let codec = JsonCodec;
///
/// let envelope = Envelope {
///     seq: 1,
///     timestamp: 5000,
///     body: ServerMessage::Event(GameEvent::ChoiceTimerTick {
///         session_id: SessionId(4),
///         round: 2,
///         seconds_remaining: 7,
///     }),
/// };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope<ServerMessage> = codec.decode(&bytes).unwrap();
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

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
