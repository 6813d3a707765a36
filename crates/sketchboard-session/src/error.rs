//! Error types for the session engine.

use sketchboard_protocol::ParticipantId;

/// Rule violations reported by [`SessionEngine`](crate::SessionEngine).
///
/// Every variant is a synchronous validation failure: when one is
/// returned the engine state is exactly what it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session already holds `capacity` participants.
    #[error("session is full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("participant {0} already joined")]
    AlreadyJoined(ParticipantId),

    #[error("participant {0} is not in the session")]
    NotAJoinedParticipant(ParticipantId),

    /// The session is private and not accepting joins.
    #[error("session is private")]
    AccessDenied,

    #[error("score cannot be negative (got {0})")]
    NegativeScore(i64),

    /// A score was set for someone who isn't a participant.
    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    /// A stroke addressed a cell outside the board. The whole edit was
    /// rejected.
    #[error("cell ({x}, {y}) is outside the board")]
    OutOfBounds { x: usize, y: usize },

    /// Capacity must be positive and not below the current head count.
    #[error("capacity {requested} is invalid with {participants} participants")]
    InvalidCapacity { requested: usize, participants: usize },
}

impl SessionError {
    /// Stable name used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CapacityExceeded { .. } => "CapacityExceeded",
            Self::AlreadyJoined(_) => "AlreadyJoined",
            Self::NotAJoinedParticipant(_) => "NotAJoinedParticipant",
            Self::AccessDenied => "AccessDenied",
            Self::NegativeScore(_) => "NegativeScore",
            Self::UnknownParticipant(_) => "UnknownParticipant",
            Self::OutOfBounds { .. } => "OutOfBounds",
            Self::InvalidCapacity { .. } => "InvalidCapacity",
        }
    }
}
