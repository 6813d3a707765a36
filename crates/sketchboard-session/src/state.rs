//! Session state and the snapshot broadcast to observers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sketchboard_protocol::{AccessMode, ParticipantId, SessionId};

use crate::{Activity, SessionConfig};

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// One row of the score list as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantScore {
    pub participant_id: ParticipantId,
    pub score: i64,
}

/// Scores keyed by participant, unique by id.
///
/// Kept in a `BTreeMap` so two score sets with the same pairs are equal
/// no matter in which order they were written. On the wire it is a list
/// of [`ParticipantScore`] sorted by participant id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ParticipantScore>", into = "Vec<ParticipantScore>")]
pub struct Scores(BTreeMap<ParticipantId, i64>);

impl Scores {
    pub fn get(&self, participant: ParticipantId) -> Option<i64> {
        self.0.get(&participant).copied()
    }

    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.0.contains_key(&participant)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ParticipantScore> + '_ {
        self.0.iter().map(|(participant_id, score)| ParticipantScore {
            participant_id: *participant_id,
            score: *score,
        })
    }

    pub fn to_vec(&self) -> Vec<ParticipantScore> {
        self.iter().collect()
    }

    pub(crate) fn set(&mut self, participant: ParticipantId, score: i64) {
        self.0.insert(participant, score);
    }

    pub(crate) fn remove(&mut self, participant: ParticipantId) {
        self.0.remove(&participant);
    }
}

impl From<Vec<ParticipantScore>> for Scores {
    fn from(list: Vec<ParticipantScore>) -> Self {
        Self(
            list.into_iter()
                .map(|entry| (entry.participant_id, entry.score))
                .collect(),
        )
    }
}

impl From<Scores> for Vec<ParticipantScore> {
    fn from(scores: Scores) -> Self {
        scores.to_vec()
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The versioned, serializable state of one session.
///
/// Only [`SessionEngine`](crate::SessionEngine) writes these fields;
/// everyone else gets read access through the getters or a cloned
/// [`Snapshot`].
///
/// The activity payload is flattened, so for the sketch board the JSON
/// reads `{ "board": [...], "backgroundColor": "#ffffff", "accessMode":
/// "PUBLIC", "capacity": 5, "leaderId": 1, "scores": [...],
/// "drawPermission": true }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(serialize = "A: Activity", deserialize = "A: Activity"))]
pub struct SessionState<A> {
    #[serde(flatten)]
    pub(crate) activity: A,
    pub(crate) access_mode: AccessMode,
    pub(crate) capacity: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) leader_id: Option<ParticipantId>,
    pub(crate) scores: Scores,
    pub(crate) draw_permission: bool,
}

impl<A: Activity> SessionState<A> {
    /// Default state for a freshly created session.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            activity: A::new(config),
            access_mode: AccessMode::Public,
            capacity: config.capacity,
            leader_id: None,
            scores: Scores::default(),
            draw_permission: true,
        }
    }

    pub fn activity(&self) -> &A {
        &self.activity
    }

    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn leader_id(&self) -> Option<ParticipantId> {
        self.leader_id
    }

    pub fn scores(&self) -> &Scores {
        &self.scores
    }

    pub fn draw_permission(&self) -> bool {
        self.draw_permission
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything an observer needs to rebuild its view of a session.
///
/// Sent whole after every applied command; there is no delta format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(serialize = "A: Activity", deserialize = "A: Activity"))]
pub struct Snapshot<A> {
    pub session_id: SessionId,
    pub state: SessionState<A>,
    /// Participants in join order.
    pub participant_ids: Vec<ParticipantId>,
}
