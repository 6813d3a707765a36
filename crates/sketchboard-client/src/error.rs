//! Error types for the client layer.

use sketchboard_protocol::ProtocolError;

/// Errors surfaced when issuing commands.
///
/// A command that isn't sent because there is no session to address is
/// not an error; see [`AreaClient`](crate::AreaClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server refused the command. `kind` is the stable error name
    /// (`"AccessDenied"`, `"SessionIdMismatch"`, ...).
    #[error("{kind} ({code}): {message}")]
    Rejected {
        code: u16,
        kind: String,
        message: String,
    },

    /// The server accepted a join but didn't say which session.
    #[error("join acknowledged without a session id")]
    MissingSessionId,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport to the server is gone.
    #[error("connection closed")]
    Closed,
}

impl ClientError {
    /// The rejection kind, if the server sent one.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Rejected { kind, .. } => Some(kind),
            _ => None,
        }
    }
}
