//! Snapshot reconciliation: from full snapshots to per-facet events.
//!
//! The server sends the whole session after every change. The reconciler
//! keeps the previous one and reports only what actually differs, so a
//! UI can redraw the board when the board changed and leave it alone when
//! only a score moved.

use std::collections::HashSet;

use sketchboard_protocol::{AccessMode, ParticipantId, SessionId};
use sketchboard_session::{
    Activity, Board, ParticipantScore, Scores, SessionConfig, SketchBoard, Snapshot,
};
use tokio::sync::mpsc;

use crate::IdentitySource;

/// A change noticed between two snapshots.
///
/// `A` is the activity, `P` the resolved participant type.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcilerEvent<A, P> {
    /// The resolved participant set changed (or the session ended).
    ParticipantsChanged(Vec<P>),
    /// A snapshot arrived. Fires for every update, changed or not.
    SnapshotUpdated,
    /// The activity content differs. For the sketch board: the board.
    BoardChanged(A),
    DrawPermissionChanged(bool),
    AccessModeChanged(AccessMode),
    ScoresChanged(Scores),
    CapacityChanged(usize),
    LeaderChanged(Option<ParticipantId>),
}

type EventSender<A, P> = mpsc::UnboundedSender<ReconcilerEvent<A, P>>;

/// Holds the last snapshot of one area and diffs each new one against it.
///
/// Purely local: it never sends commands and never blocks.
pub struct Reconciler<A: Activity, I: IdentitySource> {
    identity: I,
    /// Used for the blank activity reported when there is no session.
    config: SessionConfig,
    snapshot: Option<Snapshot<A>>,
    participants: Vec<I::Participant>,
    session_id: Option<SessionId>,
    subscribers: Vec<EventSender<A, I::Participant>>,
}

impl<A: Activity, I: IdentitySource> Reconciler<A, I> {
    pub fn new(identity: I) -> Self {
        Self::with_config(identity, SessionConfig::default())
    }

    pub fn with_config(identity: I, config: SessionConfig) -> Self {
        Self::with_snapshot(identity, config, None)
    }

    /// Starts from an area state the caller already holds. The snapshot
    /// becomes the baseline for the first [`update`](Self::update) and
    /// no events are emitted for it.
    pub fn with_snapshot(
        identity: I,
        config: SessionConfig,
        snapshot: Option<Snapshot<A>>,
    ) -> Self {
        let mut reconciler = Self {
            identity,
            config,
            snapshot: None,
            participants: Vec::new(),
            session_id: None,
            subscribers: Vec::new(),
        };
        if let Some(initial) = &snapshot {
            reconciler.participants = reconciler.resolve(&initial.participant_ids);
            reconciler.session_id = Some(initial.session_id.clone());
        }
        reconciler.snapshot = snapshot;
        reconciler
    }

    /// A new event stream. Every later [`update`](Self::update) delivers
    /// its events to every live subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ReconcilerEvent<A, I::Participant>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Replaces the cached snapshot with `next` (`None`: the area has no
    /// session) and returns the events that describes, in order:
    /// participants, `SnapshotUpdated`, then one event per changed facet.
    ///
    /// Feeding the same snapshot twice yields only `SnapshotUpdated` the
    /// second time. A `None` update always reports an empty participant
    /// list, even when it was already empty.
    pub fn update(
        &mut self,
        next: Option<Snapshot<A>>,
    ) -> Vec<ReconcilerEvent<A, I::Participant>> {
        let mut events = Vec::new();

        match &next {
            Some(snapshot) => {
                let resolved = self.resolve(&snapshot.participant_ids);
                if participants_differ(&self.participants, &resolved) {
                    self.participants = resolved;
                    events.push(ReconcilerEvent::ParticipantsChanged(
                        self.participants.clone(),
                    ));
                }
            }
            // No session: always report the cleared list.
            None => {
                self.participants.clear();
                events.push(ReconcilerEvent::ParticipantsChanged(Vec::new()));
            }
        }

        events.push(ReconcilerEvent::SnapshotUpdated);

        if let Some(new) = &next {
            let old = self.snapshot.as_ref().map(|s| &s.state);
            let state = &new.state;

            if old.map(|o| o.activity()) != Some(state.activity()) {
                events.push(ReconcilerEvent::BoardChanged(state.activity().clone()));
            }
            if old.map(|o| o.draw_permission()) != Some(state.draw_permission()) {
                events.push(ReconcilerEvent::DrawPermissionChanged(
                    state.draw_permission(),
                ));
            }
            if old.map(|o| o.access_mode()) != Some(state.access_mode()) {
                events.push(ReconcilerEvent::AccessModeChanged(state.access_mode()));
            }
            if old.map(|o| o.scores()) != Some(state.scores()) {
                events.push(ReconcilerEvent::ScoresChanged(state.scores().clone()));
            }
            if old.map(|o| o.capacity()) != Some(state.capacity()) {
                events.push(ReconcilerEvent::CapacityChanged(state.capacity()));
            }
            if old.map(|o| o.leader_id()) != Some(state.leader_id()) {
                events.push(ReconcilerEvent::LeaderChanged(state.leader_id()));
            }

            self.session_id = Some(new.session_id.clone());
        }

        self.snapshot = next;
        self.publish(&events);
        events
    }

    fn resolve(&self, ids: &[ParticipantId]) -> Vec<I::Participant> {
        ids.iter()
            .filter_map(|id| {
                let resolved = self.identity.resolve(*id);
                if resolved.is_none() {
                    tracing::warn!(participant_id = %id, "unknown participant in snapshot");
                }
                resolved
            })
            .collect()
    }

    fn publish(&mut self, events: &[ReconcilerEvent<A, I::Participant>]) {
        self.subscribers.retain(|tx| {
            events.iter().all(|event| tx.send(event.clone()).is_ok())
        });
    }

    // -- Reads -------------------------------------------------------------

    pub fn snapshot(&self) -> Option<&Snapshot<A>> {
        self.snapshot.as_ref()
    }

    pub fn has_session(&self) -> bool {
        self.snapshot.is_some()
    }

    /// The last session id seen. Survives a `None` update so commands can
    /// still address the session.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Remembers a session id learned outside a snapshot (a join ack).
    pub fn remember_session(&mut self, session_id: SessionId) {
        self.session_id = Some(session_id);
    }

    /// Current activity content, or blank content when there's no session.
    pub fn activity(&self) -> A {
        match &self.snapshot {
            Some(s) => s.state.activity().clone(),
            None => A::new(&self.config),
        }
    }

    pub fn participants(&self) -> &[I::Participant] {
        &self.participants
    }

    /// `true` when there is no session.
    pub fn draw_enabled(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_none_or(|s| s.state.draw_permission())
    }

    pub fn room_locked(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|s| s.state.access_mode().is_private())
    }

    pub fn leader(&self) -> Option<ParticipantId> {
        self.snapshot.as_ref().and_then(|s| s.state.leader_id())
    }

    pub fn is_leader(&self, participant: ParticipantId) -> bool {
        self.leader() == Some(participant)
    }

    /// Score entries; empty when there's no session.
    pub fn scores(&self) -> Vec<ParticipantScore> {
        self.snapshot
            .as_ref()
            .map(|s| s.state.scores().to_vec())
            .unwrap_or_default()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.snapshot.as_ref().map(|s| s.state.capacity())
    }
}

impl<I: IdentitySource> Reconciler<SketchBoard, I> {
    /// The board, or an all-background board when there's no session.
    pub fn board(&self) -> Board {
        match &self.snapshot {
            Some(s) => s.state.activity().board().clone(),
            None => Board::filled(self.config.background_color),
        }
    }
}

fn participants_differ<P: Eq + std::hash::Hash>(old: &[P], new: &[P]) -> bool {
    if old.len() != new.len() {
        return true;
    }
    let old: HashSet<&P> = old.iter().collect();
    let new: HashSet<&P> = new.iter().collect();
    old.symmetric_difference(&new).next().is_some()
}
