//! Core protocol types: identifiers and the frames that travel on a
//! connection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::CommandEnvelope;
use crate::CommandAck;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Stable per-user identifier handed out by the identity source.
///
/// A newtype over `u64` so it can't be confused with an [`AreaId`].
/// `#[serde(transparent)]` keeps it a plain number in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifier of one live session, generated by the server when the
/// session is created. Opaque to clients; they only echo it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an area: a place on the server that hosts at most one
/// live session at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(pub u64);

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AccessMode
// ---------------------------------------------------------------------------

/// Whether a session accepts new participants.
///
/// `Private` only blocks joins; nobody already inside is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessMode {
    #[default]
    Public,
    Private,
}

impl AccessMode {
    pub fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "PUBLIC"),
            Self::Private => write!(f, "PRIVATE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// A summary row returned by [`ClientMessage::ListAreas`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaListEntry {
    pub area_id: AreaId,
    /// `None` until someone has joined the area at least once.
    pub session_id: Option<SessionId>,
    pub participant_count: usize,
    pub capacity: Option<usize>,
    pub access_mode: Option<AccessMode>,
    pub observer_count: usize,
}

/// Client → server messages.
///
/// Internally tagged: `{ "type": "EnterArea", "area_id": 3 }`.
/// `E` is the activity's edit payload carried by [`CommandEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(bound(
    serialize = "E: Serialize",
    deserialize = "E: Deserialize<'de>"
))]
pub enum ClientMessage<E> {
    /// First frame on every connection. `token` goes to the
    /// authenticator.
    Handshake { version: u32, token: Option<String> },

    /// Keep-alive; the server echoes `client_time` back.
    Heartbeat { client_time: u64 },

    /// Start observing an area: receive its snapshots from now on.
    EnterArea { area_id: AreaId },

    /// Stop observing the current area. Leaves its session too.
    ExitArea,

    ListAreas,

    /// A session command aimed at an area.
    Command {
        area_id: AreaId,
        command: CommandEnvelope<E>,
    },

    Disconnect { reason: String },
}

/// Server → client messages.
///
/// `S` is the snapshot type of the hosted activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(bound(
    serialize = "S: Serialize",
    deserialize = "S: Deserialize<'de>"
))]
pub enum ServerMessage<S> {
    HandshakeAck {
        participant_id: ParticipantId,
        server_time: u64,
    },

    HeartbeatAck { client_time: u64, server_time: u64 },

    AreaEntered { area_id: AreaId },

    AreaList { areas: Vec<AreaListEntry> },

    /// Reply to the caller of a successful command.
    CommandAck { area_id: AreaId, ack: CommandAck },

    /// The full state of an area's session. Pushed to every observer
    /// after each applied command, and once on entering an area that
    /// already has a session.
    Snapshot { area_id: AreaId, snapshot: S },

    /// `code` follows HTTP conventions; `kind` is the stable error name
    /// (e.g. `"CapacityExceeded"`).
    Error {
        code: u16,
        kind: String,
        message: String,
    },
}

/// Every frame on the wire.
///
/// `seq` is a per-sender counter; `timestamp` is milliseconds since the
/// sender started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<P> {
    pub seq: u64,
    pub timestamp: u64,
    pub payload: P,
}

impl<P> Envelope<P> {
    pub fn new(seq: u64, timestamp: u64, payload: P) -> Self {
        Self {
            seq,
            timestamp,
            payload,
        }
    }
}
