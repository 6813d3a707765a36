//! The transport seam between a client and the area authority.

use sketchboard_protocol::{CommandAck, CommandEnvelope};

use crate::ClientError;

/// Delivers command envelopes to the server and returns its verdict.
///
/// The sink knows who the caller is (the connection it was opened on),
/// so envelopes carry no participant id. Implement it over a WebSocket
/// in a real client, or in-process for tests and bots.
///
/// # Example
///
/// ```rust
/// use sketchboard_client::{ClientError, CommandSink};
/// use sketchboard_protocol::{CommandAck, CommandEnvelope, Stroke};
///
/// /// Accepts everything and sends nothing anywhere.
/// struct NullSink;
///
/// impl CommandSink<Vec<Stroke>> for NullSink {
///     async fn send(
///         &self,
///         _envelope: CommandEnvelope<Vec<Stroke>>,
///     ) -> Result<CommandAck, ClientError> {
///         Ok(CommandAck::default())
///     }
/// }
/// ```
pub trait CommandSink<E>: Send + Sync {
    fn send(
        &self,
        envelope: CommandEnvelope<E>,
    ) -> impl std::future::Future<Output = Result<CommandAck, ClientError>> + Send;
}
