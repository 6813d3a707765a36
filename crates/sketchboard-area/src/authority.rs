//! The area authority: the server-side command dispatcher for one area.
//!
//! For each command it checks, in order:
//!
//! 1. a live session exists (`NoActiveSession`), except for joins
//! 2. the envelope's session id matches it (`SessionIdMismatch`)
//! 3. the caller may issue this command (`NotAuthorized`)
//!
//! then hands the command to the [`SessionEngine`]. Only when all of
//! that succeeds is the full snapshot broadcast, exactly once.

use std::collections::HashMap;

use sketchboard_protocol::{
    AccessMode, AreaId, AreaListEntry, Command, CommandAck, CommandEnvelope, ParticipantId,
    ScoreUpdate, SessionId,
};
use sketchboard_session::{Activity, SessionConfig, SessionEngine, Snapshot};
use tokio::sync::mpsc;

use crate::AreaError;

/// Channel an observer receives snapshots on.
pub type SnapshotSender<A> = mpsc::UnboundedSender<Snapshot<A>>;

/// Area metadata (not the session state itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaInfo {
    pub area_id: AreaId,
    pub session_id: Option<SessionId>,
    pub participant_count: usize,
    pub capacity: Option<usize>,
    pub access_mode: Option<AccessMode>,
    pub observer_count: usize,
}

impl From<AreaInfo> for AreaListEntry {
    fn from(info: AreaInfo) -> Self {
        Self {
            area_id: info.area_id,
            session_id: info.session_id,
            participant_count: info.participant_count,
            capacity: info.capacity,
            access_mode: info.access_mode,
            observer_count: info.observer_count,
        }
    }
}

/// What a command changes, once membership commands are out of the way.
enum Change<E> {
    AccessMode(AccessMode),
    Capacity(usize),
    DrawPermission(bool),
    Edit(E),
    Reset,
    Score(ScoreUpdate),
}

/// Owns the one session of an area and everyone watching it.
///
/// Not thread-safe on purpose: the area actor is its only owner and
/// feeds it one request at a time.
pub struct AreaAuthority<A: Activity> {
    area_id: AreaId,
    config: SessionConfig,
    /// Created by the first join, then reused for the area's lifetime.
    session: Option<SessionEngine<A>>,
    observers: HashMap<ParticipantId, SnapshotSender<A>>,
}

impl<A: Activity> AreaAuthority<A> {
    pub fn new(area_id: AreaId, config: SessionConfig) -> Self {
        Self {
            area_id,
            config,
            session: None,
            observers: HashMap::new(),
        }
    }

    pub fn area_id(&self) -> AreaId {
        self.area_id
    }

    pub fn session(&self) -> Option<&SessionEngine<A>> {
        self.session.as_ref()
    }

    pub fn snapshot(&self) -> Option<Snapshot<A>> {
        self.session.as_ref().map(SessionEngine::snapshot)
    }

    /// Validates and applies one command from `caller`.
    ///
    /// On success every observer receives the new snapshot and the caller
    /// gets an ack (carrying the session id for joins). On failure nothing
    /// changes and nobody is notified.
    pub fn handle_command(
        &mut self,
        caller: ParticipantId,
        envelope: CommandEnvelope<A::Edit>,
    ) -> Result<CommandAck, AreaError> {
        let command = envelope.command.name();
        match self.apply(caller, envelope) {
            Ok(ack) => {
                tracing::debug!(area_id = %self.area_id, %caller, command, "command applied");
                self.broadcast();
                Ok(ack)
            }
            Err(e) => {
                tracing::debug!(
                    area_id = %self.area_id,
                    %caller,
                    command,
                    error = %e,
                    "command rejected"
                );
                Err(e)
            }
        }
    }

    fn apply(
        &mut self,
        caller: ParticipantId,
        envelope: CommandEnvelope<A::Edit>,
    ) -> Result<CommandAck, AreaError> {
        let CommandEnvelope {
            session_id,
            command,
        } = envelope;
        let leader_only = command.is_leader_only();
        let board_mutation = command.is_board_mutation();

        let change = match command {
            Command::RequestJoin => return self.join(caller),
            Command::RequestLeave => {
                self.live_session(session_id.as_ref())?.leave(caller)?;
                return Ok(CommandAck::default());
            }
            Command::SetAccessMode(mode) => Change::AccessMode(mode),
            Command::SetCapacity(capacity) => Change::Capacity(capacity),
            Command::SetDrawPermission(enabled) => Change::DrawPermission(enabled),
            Command::BoardEdit(edit) => Change::Edit(edit),
            Command::BoardReset => Change::Reset,
            Command::SetScore(update) => Change::Score(update),
        };

        let session = self.live_session(session_id.as_ref())?;
        let is_leader = session.is_leader(caller);
        if !session.is_participant(caller) {
            return Err(AreaError::NotAuthorized("caller is not a participant"));
        }
        if leader_only && !is_leader {
            return Err(AreaError::NotAuthorized("only the leader can do that"));
        }
        if board_mutation && !session.state().draw_permission() && !is_leader {
            return Err(AreaError::NotAuthorized("drawing is disabled"));
        }

        match change {
            Change::AccessMode(mode) => session.set_access_mode(mode),
            Change::Capacity(capacity) => session.set_capacity(capacity)?,
            Change::DrawPermission(enabled) => session.set_draw_permission(enabled),
            Change::Edit(edit) => session.apply_edit(edit)?,
            Change::Reset => session.reset_board(),
            Change::Score(update) => session.set_score(update.participant_id, update.score)?,
        }
        Ok(CommandAck::default())
    }

    /// Creates the session on first use, then joins it.
    fn join(&mut self, caller: ParticipantId) -> Result<CommandAck, AreaError> {
        let area_id = self.area_id;
        let config = &self.config;
        let session = self.session.get_or_insert_with(|| {
            let session = SessionEngine::new(config);
            tracing::info!(%area_id, session_id = %session.id(), "session created");
            session
        });
        session.join(caller)?;
        Ok(CommandAck {
            session_id: Some(session.id().clone()),
        })
    }

    /// The session a non-join command addresses. A missing id never
    /// matches.
    fn live_session(
        &mut self,
        session_id: Option<&SessionId>,
    ) -> Result<&mut SessionEngine<A>, AreaError> {
        let session = self
            .session
            .as_mut()
            .ok_or(AreaError::NoActiveSession(self.area_id))?;
        if session_id != Some(session.id()) {
            return Err(AreaError::SessionIdMismatch);
        }
        Ok(session)
    }

    // -- Observers ---------------------------------------------------------

    /// Registers an observer. If a session exists it immediately gets the
    /// current snapshot, so a late arrival doesn't wait for the next
    /// change. Re-registering replaces the old channel.
    pub fn add_observer(&mut self, observer: ParticipantId, sender: SnapshotSender<A>) {
        if let Some(snapshot) = self.snapshot() {
            let _ = sender.send(snapshot);
        }
        self.observers.insert(observer, sender);
        tracing::debug!(area_id = %self.area_id, %observer, "observer entered");
    }

    /// Unregisters an observer. An observer walking away also leaves the
    /// session if they were in it; the remaining observers see that
    /// through a broadcast.
    pub fn remove_observer(&mut self, observer: ParticipantId) {
        self.observers.remove(&observer);
        tracing::debug!(area_id = %self.area_id, %observer, "observer exited");

        let left = self
            .session
            .as_mut()
            .filter(|session| session.is_participant(observer))
            .map(|session| session.leave(observer));
        if let Some(Ok(_)) = left {
            self.broadcast();
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn info(&self) -> AreaInfo {
        let session = self.session.as_ref();
        AreaInfo {
            area_id: self.area_id,
            session_id: session.map(|s| s.id().clone()),
            participant_count: session.map_or(0, SessionEngine::participant_count),
            capacity: session.map(|s| s.state().capacity()),
            access_mode: session.map(|s| s.state().access_mode()),
            observer_count: self.observers.len(),
        }
    }

    /// Sends the full snapshot to every observer. Observers whose
    /// receiver is gone are dropped.
    fn broadcast(&mut self) {
        let Some(snapshot) = self.snapshot() else {
            return;
        };
        self.observers
            .retain(|_, sender| sender.send(snapshot.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use sketchboard_protocol::{Color, ScoreUpdate, Stroke};
    use sketchboard_session::{SessionError, SketchBoard};
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;

    type Authority = AreaAuthority<SketchBoard>;

    fn pid(id: u64) -> ParticipantId {
        ParticipantId(id)
    }

    fn authority() -> Authority {
        AreaAuthority::new(AreaId(1), SessionConfig::default())
    }

    fn observe(authority: &mut Authority, id: u64) -> UnboundedReceiver<Snapshot<SketchBoard>> {
        let (tx, rx) = mpsc::unbounded_channel();
        authority.add_observer(pid(id), tx);
        rx
    }

    fn join(authority: &mut Authority, id: u64) -> SessionId {
        authority
            .handle_command(pid(id), CommandEnvelope::join())
            .expect("join should succeed")
            .session_id
            .expect("join ack carries the session id")
    }

    fn cmd(session: &SessionId, command: Command<Vec<Stroke>>) -> CommandEnvelope<Vec<Stroke>> {
        CommandEnvelope::new(Some(session.clone()), command)
    }

    fn drain(rx: &mut UnboundedReceiver<Snapshot<SketchBoard>>) -> Vec<Snapshot<SketchBoard>> {
        let mut out = Vec::new();
        while let Ok(s) = rx.try_recv() {
            out.push(s);
        }
        out
    }

    #[test]
    fn test_join_creates_session_and_broadcasts_once() {
        let mut area = authority();
        let mut rx = observe(&mut area, 100);

        let sid = join(&mut area, 1);

        let snapshots = drain(&mut rx);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].session_id, sid);
        assert_eq!(snapshots[0].participant_ids, vec![pid(1)]);
        assert_eq!(snapshots[0].state.leader_id(), Some(pid(1)));
    }

    #[test]
    fn test_second_join_resumes_same_session() {
        let mut area = authority();
        let first = join(&mut area, 1);
        let second = join(&mut area, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_command_without_session_is_no_active_session() {
        let mut area = authority();
        let err = area
            .handle_command(pid(1), cmd(&SessionId::from("x"), Command::RequestLeave))
            .unwrap_err();
        assert_eq!(err, AreaError::NoActiveSession(AreaId(1)));
    }

    #[test]
    fn test_stale_or_missing_session_id_is_mismatch() {
        let mut area = authority();
        join(&mut area, 1);

        let stale = area.handle_command(pid(1), cmd(&SessionId::from("old"), Command::BoardReset));
        assert_eq!(stale, Err(AreaError::SessionIdMismatch));

        let missing = area.handle_command(pid(1), CommandEnvelope::new(None, Command::BoardReset));
        assert_eq!(missing, Err(AreaError::SessionIdMismatch));
    }

    #[test]
    fn test_leader_only_commands_reject_non_leader_without_broadcast() {
        let mut area = authority();
        let sid = join(&mut area, 1);
        join(&mut area, 2);
        let mut rx = observe(&mut area, 100);
        drain(&mut rx);

        for command in [
            Command::SetAccessMode(AccessMode::Private),
            Command::SetCapacity(3),
            Command::SetDrawPermission(false),
            Command::SetScore(ScoreUpdate {
                participant_id: pid(1),
                score: 5,
            }),
        ] {
            let err = area.handle_command(pid(2), cmd(&sid, command)).unwrap_err();
            assert!(matches!(err, AreaError::NotAuthorized(_)));
        }

        assert!(drain(&mut rx).is_empty());
        let state = area.session().unwrap().state();
        assert_eq!(state.access_mode(), AccessMode::Public);
        assert_eq!(state.capacity(), 5);
        assert!(state.draw_permission());
    }

    #[test]
    fn test_draw_disabled_blocks_others_but_not_leader() {
        let mut area = authority();
        let sid = join(&mut area, 1);
        join(&mut area, 2);
        area.handle_command(pid(1), cmd(&sid, Command::SetDrawPermission(false)))
            .unwrap();

        let stroke = vec![Stroke::new(0, 0, Color::BLACK)];
        let err = area
            .handle_command(pid(2), cmd(&sid, Command::BoardEdit(stroke.clone())))
            .unwrap_err();
        assert!(matches!(err, AreaError::NotAuthorized(_)));
        assert!(matches!(
            area.handle_command(pid(2), cmd(&sid, Command::BoardReset)),
            Err(AreaError::NotAuthorized(_))
        ));

        area.handle_command(pid(1), cmd(&sid, Command::BoardEdit(stroke)))
            .unwrap();
        let board = area.session().unwrap().state().activity().board().clone();
        assert_eq!(board.get(0, 0), Some(Color::BLACK));
    }

    #[test]
    fn test_draw_enabled_lets_any_participant_draw() {
        let mut area = authority();
        let sid = join(&mut area, 1);
        join(&mut area, 2);

        area.handle_command(
            pid(2),
            cmd(&sid, Command::BoardEdit(vec![Stroke::new(1, 1, Color::BLACK)])),
        )
        .unwrap();
    }

    #[test]
    fn test_non_participant_cannot_draw() {
        let mut area = authority();
        let sid = join(&mut area, 1);
        let err = area
            .handle_command(pid(9), cmd(&sid, Command::BoardReset))
            .unwrap_err();
        assert!(matches!(err, AreaError::NotAuthorized(_)));
    }

    #[test]
    fn test_set_score_for_non_participant_fails_without_broadcast() {
        let mut area = authority();
        let sid = join(&mut area, 1);
        let mut rx = observe(&mut area, 100);
        drain(&mut rx);

        let err = area
            .handle_command(
                pid(1),
                cmd(
                    &sid,
                    Command::SetScore(ScoreUpdate {
                        participant_id: pid(2),
                        score: 3,
                    }),
                ),
            )
            .unwrap_err();

        assert_eq!(err, AreaError::Session(SessionError::UnknownParticipant(pid(2))));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_out_of_bounds_edit_is_rejected_without_broadcast() {
        let mut area = authority();
        let sid = join(&mut area, 1);
        let mut rx = observe(&mut area, 100);
        drain(&mut rx);

        let err = area
            .handle_command(
                pid(1),
                cmd(&sid, Command::BoardEdit(vec![Stroke::new(999, 0, Color::BLACK)])),
            )
            .unwrap_err();
        assert_eq!(err.kind(), "OutOfBounds");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_session_checks_run_before_caller_checks_for_every_command() {
        let mut area = authority();
        let mut rx = observe(&mut area, 9);
        join(&mut area, 1);
        drain(&mut rx);

        let stale = SessionId::from("old");
        let commands = vec![
            Command::RequestLeave,
            Command::SetAccessMode(AccessMode::Private),
            Command::SetCapacity(3),
            Command::SetDrawPermission(false),
            Command::BoardEdit(vec![Stroke::new(0, 0, Color::BLACK)]),
            Command::BoardReset,
            Command::SetScore(ScoreUpdate {
                participant_id: pid(1),
                score: 1,
            }),
        ];
        for command in commands {
            // pid(2) isn't a participant, but the stale id is reported first.
            let name = command.name();
            assert_eq!(
                area.handle_command(pid(2), cmd(&stale, command)),
                Err(AreaError::SessionIdMismatch),
                "{name}"
            );
        }
        assert!(drain(&mut rx).is_empty());
        assert_eq!(area.session().unwrap().participants(), &[pid(1)]);
    }

    #[test]
    fn test_leave_by_non_participant_is_not_a_joined_participant() {
        let mut area = authority();
        let sid = join(&mut area, 1);
        let err = area
            .handle_command(pid(2), cmd(&sid, Command::RequestLeave))
            .unwrap_err();
        assert_eq!(err, AreaError::Session(SessionError::NotAJoinedParticipant(pid(2))));
    }

    #[test]
    fn test_private_then_last_leave_keeps_session_id_and_reopens() {
        let mut area = authority();
        let sid = join(&mut area, 1);
        area.handle_command(pid(1), cmd(&sid, Command::SetAccessMode(AccessMode::Private)))
            .unwrap();

        let denied = area.handle_command(pid(2), CommandEnvelope::join()).unwrap_err();
        assert_eq!(denied, AreaError::Session(SessionError::AccessDenied));

        area.handle_command(pid(1), cmd(&sid, Command::RequestLeave))
            .unwrap();
        let state = area.session().unwrap().state();
        assert_eq!(state.access_mode(), AccessMode::Public);
        assert_eq!(state.leader_id(), None);

        assert_eq!(join(&mut area, 2), sid);
    }

    #[test]
    fn test_add_observer_receives_current_snapshot() {
        let mut area = authority();
        let mut early = observe(&mut area, 100);
        assert!(drain(&mut early).is_empty());

        join(&mut area, 1);
        let mut late = observe(&mut area, 101);
        let snapshots = drain(&mut late);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].participant_ids, vec![pid(1)]);
    }

    #[test]
    fn test_remove_observer_leaves_session_and_broadcasts() {
        let mut area = authority();
        join(&mut area, 1);
        join(&mut area, 2);
        let _leaver = observe(&mut area, 1);
        let mut watcher = observe(&mut area, 100);
        drain(&mut watcher);

        area.remove_observer(pid(1));

        let snapshots = drain(&mut watcher);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].participant_ids, vec![pid(2)]);
        assert_eq!(snapshots[0].state.leader_id(), Some(pid(2)));
        assert_eq!(area.observer_count(), 1);
    }

    #[test]
    fn test_remove_observer_who_is_not_participant_is_silent() {
        let mut area = authority();
        join(&mut area, 1);
        let _guest = observe(&mut area, 50);
        let mut watcher = observe(&mut area, 100);
        drain(&mut watcher);

        area.remove_observer(pid(50));
        assert!(drain(&mut watcher).is_empty());
    }

    #[test]
    fn test_closed_observer_channels_are_pruned() {
        let mut area = authority();
        let rx = observe(&mut area, 100);
        drop(rx);

        join(&mut area, 1);
        assert_eq!(area.observer_count(), 0);
    }

    #[test]
    fn test_info_reflects_session() {
        let mut area = authority();
        assert_eq!(area.info().session_id, None);
        assert_eq!(area.info().participant_count, 0);

        let sid = join(&mut area, 1);
        let info = area.info();
        assert_eq!(info.session_id, Some(sid));
        assert_eq!(info.participant_count, 1);
        assert_eq!(info.capacity, Some(5));
        assert_eq!(info.access_mode, Some(AccessMode::Public));
    }
}
