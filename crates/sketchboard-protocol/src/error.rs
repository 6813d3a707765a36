//! Error types for the protocol layer.
//!
//! Every crate in the workspace has its own error enum. A
//! `ProtocolError` always means "the bytes or text were wrong", never
//! "the session said no".

/// Errors that can occur while encoding, decoding, or parsing wire values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, or an
    /// unknown `type` tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A color string was not of the form `#rrggbb`.
    #[error("invalid color {0:?}: expected #rrggbb")]
    InvalidColor(String),

    /// The frame parsed but breaks a protocol rule (wrong first message,
    /// version mismatch, ...).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
