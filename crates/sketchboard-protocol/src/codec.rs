//! Codec trait and implementations for turning frames into bytes.
//!
//! The server and the client never call `serde_json` directly; they go
//! through a [`Codec`]. Only [`JsonCodec`] exists today, which keeps
//! frames readable in browser devtools.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because the codec lives in the shared server
/// state and is used from every connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into an owned value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes don't match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// Behind the `json` feature (on by default).
///
/// ```rust
/// use sketchboard_protocol::{ClientMessage, Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame: Envelope<ClientMessage<()>> = Envelope::new(
///     1,
///     0,
///     ClientMessage::Heartbeat { client_time: 5000 },
/// );
///
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded: Envelope<ClientMessage<()>> = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
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
