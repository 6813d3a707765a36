//! Commands a participant sends to an area.
//!
//! A command is wrapped in a [`CommandEnvelope`] that carries the session
//! identifier the caller last received from a successful join. The JSON
//! shape is flat:
//!
//! ```text
//! { "type": "BoardEdit", "sessionId": "9f2c…", "payload": [ { "x": 0, "y": 3, "color": "#000000" } ] }
//! { "type": "RequestJoin" }
//! ```

use serde::{Deserialize, Serialize};

use crate::{AccessMode, Color, ParticipantId, SessionId};

/// One pixel write. `x` is the row, `y` is the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stroke {
    pub x: usize,
    pub y: usize,
    pub color: Color,
}

impl Stroke {
    pub fn new(x: usize, y: usize, color: Color) -> Self {
        Self { x, y, color }
    }
}

/// Payload of [`Command::SetScore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    pub participant_id: ParticipantId,
    /// Signed on the wire so a negative score reaches the engine and is
    /// rejected there rather than failing to decode.
    pub score: i64,
}

/// The typed command set.
///
/// `E` is the activity's edit payload; for the sketch board it is
/// `Vec<Stroke>`.
///
/// Adjacently tagged, so unit variants are just `{"type": "BoardReset"}`
/// and the others carry a `payload` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command<E> {
    RequestJoin,
    RequestLeave,
    SetAccessMode(AccessMode),
    SetCapacity(usize),
    SetDrawPermission(bool),
    BoardEdit(E),
    BoardReset,
    SetScore(ScoreUpdate),
}

impl<E> Command<E> {
    /// The `type` tag, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestJoin => "RequestJoin",
            Self::RequestLeave => "RequestLeave",
            Self::SetAccessMode(_) => "SetAccessMode",
            Self::SetCapacity(_) => "SetCapacity",
            Self::SetDrawPermission(_) => "SetDrawPermission",
            Self::BoardEdit(_) => "BoardEdit",
            Self::BoardReset => "BoardReset",
            Self::SetScore(_) => "SetScore",
        }
    }

    /// Commands only the session leader may issue.
    pub fn is_leader_only(&self) -> bool {
        matches!(
            self,
            Self::SetAccessMode(_)
                | Self::SetCapacity(_)
                | Self::SetDrawPermission(_)
                | Self::SetScore(_)
        )
    }

    /// Commands gated by the session's draw permission.
    pub fn is_board_mutation(&self) -> bool {
        matches!(self, Self::BoardEdit(_) | Self::BoardReset)
    }
}

/// A command plus the session identifier it targets.
///
/// Everything except [`Command::RequestJoin`] must carry the identifier
/// returned by the caller's last successful join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "E: Serialize",
    deserialize = "E: Deserialize<'de>"
))]
pub struct CommandEnvelope<E> {
    #[serde(
        rename = "sessionId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<SessionId>,

    #[serde(flatten)]
    pub command: Command<E>,
}

impl<E> CommandEnvelope<E> {
    pub fn new(session_id: Option<SessionId>, command: Command<E>) -> Self {
        Self {
            session_id,
            command,
        }
    }

    /// A join request. Never carries a session identifier.
    pub fn join() -> Self {
        Self::new(None, Command::RequestJoin)
    }
}

/// Inline reply to the command's caller.
///
/// Only a successful join fills `session_id`; everything else is
/// acknowledged with an empty ack. Observers learn about the change
/// through the snapshot broadcast, never through this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}
