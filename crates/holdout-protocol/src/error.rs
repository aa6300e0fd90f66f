//! Error types for the protocol layer.
//!
//! Each Holdout crate defines its own error enum. A `ProtocolError` always
//! means the bytes or values were wrong, never that the game refused an
//! action.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or an
    /// unknown command tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A value parsed structurally but is not one the protocol allows,
    /// such as a vote spelled `"maybe"`.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The message is valid JSON but breaks a protocol rule, such as a
    /// first frame that is not `Hello`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
