//! Error types for the area layer.

use sketchboard_protocol::{AreaId, ParticipantId};
use sketchboard_session::SessionError;

/// Errors returned to the caller of an area command.
///
/// A command that fails with any of these changed nothing and
/// broadcast nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AreaError {
    /// The area has never had a session.
    #[error("no active session in area {0}")]
    NoActiveSession(AreaId),

    /// The command's session identifier is missing, stale, or forged.
    #[error("session id does not match the live session")]
    SessionIdMismatch,

    /// Leader-only command from a non-leader, drawing while drawing is
    /// disabled, or a command from someone outside the session.
    #[error("not authorized: {0}")]
    NotAuthorized(&'static str),

    /// The session engine rejected the command.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("area {0} not found")]
    NotFound(AreaId),

    #[error("observer {0} is already in area {1}")]
    AlreadyInArea(ParticipantId, AreaId),

    #[error("observer {0} is not in any area")]
    NotInArea(ParticipantId),

    /// The area actor's channel is closed.
    #[error("area {0} is unavailable")]
    Unavailable(AreaId),
}

impl AreaError {
    /// Stable name used on the wire. Engine failures report their own
    /// kind (`"CapacityExceeded"`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoActiveSession(_) => "NoActiveSession",
            Self::SessionIdMismatch => "SessionIdMismatch",
            Self::NotAuthorized(_) => "NotAuthorized",
            Self::Session(e) => e.kind(),
            Self::NotFound(_) => "AreaNotFound",
            Self::AlreadyInArea(..) => "AlreadyInArea",
            Self::NotInArea(_) => "NotInArea",
            Self::Unavailable(_) => "AreaUnavailable",
        }
    }

    /// HTTP-style status code for the wire.
    pub fn code(&self) -> u16 {
        match self {
            Self::NoActiveSession(_) | Self::NotFound(_) => 404,
            Self::NotAuthorized(_) => 403,
            Self::SessionIdMismatch | Self::AlreadyInArea(..) => 409,
            Self::Session(e) => match e {
                SessionError::AccessDenied => 403,
                SessionError::CapacityExceeded { .. } | SessionError::AlreadyJoined(_) => 409,
                _ => 400,
            },
            Self::NotInArea(_) => 400,
            Self::Unavailable(_) => 503,
        }
    }
}
