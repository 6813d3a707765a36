//! The session engine: one session's membership rules and mutations.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──→ join(P1) ──→ join(P2..) ──→ leave(..) ──→ leave(last)
//!              │ P1 becomes leader          │              │
//!              │                            ▼              ▼
//!              │                  leader passes to   leader cleared,
//!              │                  first remaining    PUBLIC, board reset
//!              └───────────── next join reuses the same engine ──┘
//! ```
//!
//! The engine does no authorization. Whether the caller may change the
//! capacity or draw is decided one layer up, in the area authority.

use rand::Rng;
use sketchboard_protocol::{AccessMode, ParticipantId, SessionId};

use crate::{Activity, SessionConfig, SessionError, SessionState, Snapshot};

/// What a successful [`SessionEngine::leave`] did besides removing the
/// participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Someone other than the leader left.
    Left,
    /// The leader left; leadership moved to this participant.
    LeaderPassed(ParticipantId),
    /// The last participant left and the session was reset.
    Closed,
}

/// Owns one [`SessionState`] and enforces its invariants.
///
/// - participant count never exceeds `capacity`
/// - `leader_id` is `None` or a current participant
/// - score keys are a subset of the participants
/// - board dimensions never change
pub struct SessionEngine<A: Activity> {
    id: SessionId,
    /// Participants in join order. Leader succession depends on it.
    participants: Vec<ParticipantId>,
    state: SessionState<A>,
}

impl<A: Activity> SessionEngine<A> {
    /// Creates an empty session with a freshly generated identifier.
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_id(generate_session_id(), config)
    }

    /// Creates an empty session with a caller-chosen identifier.
    pub fn with_id(id: SessionId, config: &SessionConfig) -> Self {
        Self {
            id,
            participants: Vec::new(),
            state: SessionState::new(config),
        }
    }

    // -- Membership --------------------------------------------------------

    /// Admits a participant.
    ///
    /// # Errors
    /// Checked in this order:
    /// - [`SessionError::CapacityExceeded`]: already at capacity
    /// - [`SessionError::AlreadyJoined`]: `participant` is already in
    /// - [`SessionError::AccessDenied`]: the session is private
    pub fn join(&mut self, participant: ParticipantId) -> Result<(), SessionError> {
        if self.participants.len() >= self.state.capacity {
            return Err(SessionError::CapacityExceeded {
                capacity: self.state.capacity,
            });
        }
        if self.is_participant(participant) {
            return Err(SessionError::AlreadyJoined(participant));
        }
        if self.state.access_mode.is_private() {
            return Err(SessionError::AccessDenied);
        }

        self.participants.push(participant);
        self.state.scores.set(participant, 0);
        if self.state.leader_id.is_none() {
            self.state.leader_id = Some(participant);
        }

        tracing::info!(
            session_id = %self.id,
            %participant,
            participants = self.participants.len(),
            "participant joined"
        );
        Ok(())
    }

    /// Removes a participant and applies the succession rules.
    ///
    /// - last participant out: leader cleared, access mode back to
    ///   `Public`, activity reset
    /// - leader out with others left: the earliest remaining joiner leads
    ///
    /// # Errors
    /// [`SessionError::NotAJoinedParticipant`] if `participant` isn't in.
    pub fn leave(&mut self, participant: ParticipantId) -> Result<Departure, SessionError> {
        let index = self
            .participants
            .iter()
            .position(|p| *p == participant)
            .ok_or(SessionError::NotAJoinedParticipant(participant))?;

        self.participants.remove(index);
        self.state.scores.remove(participant);

        let departure = match self.participants.first() {
            None => {
                self.state.leader_id = None;
                self.state.access_mode = AccessMode::Public;
                self.state.activity.reset();
                Departure::Closed
            }
            Some(&next) if self.state.leader_id == Some(participant) => {
                self.state.leader_id = Some(next);
                Departure::LeaderPassed(next)
            }
            Some(_) => Departure::Left,
        };

        match departure {
            Departure::Closed => {
                tracing::info!(session_id = %self.id, %participant, "last participant left, session closed");
            }
            Departure::LeaderPassed(leader) => {
                tracing::info!(session_id = %self.id, %participant, %leader, "leader left, leadership passed");
            }
            Departure::Left => {
                tracing::info!(
                    session_id = %self.id,
                    %participant,
                    participants = self.participants.len(),
                    "participant left"
                );
            }
        }
        Ok(departure)
    }

    // -- Settings ----------------------------------------------------------

    pub fn set_access_mode(&mut self, mode: AccessMode) {
        self.state.access_mode = mode;
    }

    /// Changes the participant limit.
    ///
    /// # Errors
    /// [`SessionError::InvalidCapacity`] for `0` or a value below the
    /// current participant count.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), SessionError> {
        if capacity == 0 || capacity < self.participants.len() {
            return Err(SessionError::InvalidCapacity {
                requested: capacity,
                participants: self.participants.len(),
            });
        }
        self.state.capacity = capacity;
        Ok(())
    }

    pub fn set_draw_permission(&mut self, enabled: bool) {
        self.state.draw_permission = enabled;
    }

    // -- Content -----------------------------------------------------------

    /// Applies an activity edit. For the sketch board this writes a list
    /// of strokes; see [`SketchBoard`](crate::SketchBoard).
    pub fn apply_edit(&mut self, edit: A::Edit) -> Result<(), SessionError> {
        self.state.activity.apply_edit(edit)
    }

    /// Resets the activity (every cell back to the background color).
    pub fn reset_board(&mut self) {
        self.state.activity.reset();
    }

    /// Inserts or overwrites a participant's score.
    ///
    /// # Errors
    /// - [`SessionError::UnknownParticipant`]: not a participant
    /// - [`SessionError::NegativeScore`]: `score < 0`
    pub fn set_score(&mut self, participant: ParticipantId, score: i64) -> Result<(), SessionError> {
        if !self.is_participant(participant) {
            return Err(SessionError::UnknownParticipant(participant));
        }
        if score < 0 {
            return Err(SessionError::NegativeScore(score));
        }
        self.state.scores.set(participant, score);
        Ok(())
    }

    // -- Reads -------------------------------------------------------------

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_participant(&self, participant: ParticipantId) -> bool {
        self.participants.contains(&participant)
    }

    pub fn leader(&self) -> Option<ParticipantId> {
        self.state.leader_id
    }

    pub fn is_leader(&self, participant: ParticipantId) -> bool {
        self.state.leader_id == Some(participant)
    }

    pub fn state(&self) -> &SessionState<A> {
        &self.state
    }

    /// A full copy of the session for broadcasting.
    pub fn snapshot(&self) -> Snapshot<A> {
        Snapshot {
            session_id: self.id.clone(),
            state: self.state.clone(),
            participant_ids: self.participants.clone(),
        }
    }
}

/// 128 random bits as 32 lowercase hex characters.
fn generate_session_id() -> SessionId {
    let bytes: [u8; 16] = rand::rng().random();
    SessionId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
