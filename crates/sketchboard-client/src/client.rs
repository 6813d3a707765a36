//! `AreaClient`: a reconciler plus a way to talk back to the server.

use sketchboard_protocol::{
    AccessMode, Command, CommandEnvelope, ParticipantId, ScoreUpdate, SessionId,
};
use sketchboard_session::{Activity, Snapshot};

use crate::{ClientError, CommandSink, IdentitySource, Reconciler, ReconcilerEvent};

/// One participant's view of one area.
///
/// Commands address the session the client last saw. Until it has seen
/// one (no snapshot, no join), every command except
/// [`join_session`](Self::join_session) is a local no-op returning
/// `Ok(false)`.
pub struct AreaClient<A: Activity, I: IdentitySource, S: CommandSink<A::Edit>> {
    me: ParticipantId,
    reconciler: Reconciler<A, I>,
    sink: S,
}

impl<A, I, S> AreaClient<A, I, S>
where
    A: Activity,
    I: IdentitySource,
    S: CommandSink<A::Edit>,
{
    pub fn new(me: ParticipantId, reconciler: Reconciler<A, I>, sink: S) -> Self {
        Self {
            me,
            reconciler,
            sink,
        }
    }

    pub fn me(&self) -> ParticipantId {
        self.me
    }

    pub fn reconciler(&self) -> &Reconciler<A, I> {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut Reconciler<A, I> {
        &mut self.reconciler
    }

    /// Feeds a server push into the reconciler.
    pub fn apply_snapshot(
        &mut self,
        snapshot: Option<Snapshot<A>>,
    ) -> Vec<ReconcilerEvent<A, I::Participant>> {
        self.reconciler.update(snapshot)
    }

    pub fn is_leader(&self) -> bool {
        self.reconciler.is_leader(self.me)
    }

    /// Joins (or starts) the area's session and remembers its id.
    pub async fn join_session(&mut self) -> Result<SessionId, ClientError> {
        let ack = self.sink.send(CommandEnvelope::join()).await?;
        let session_id = ack.session_id.ok_or(ClientError::MissingSessionId)?;
        tracing::debug!(participant_id = %self.me, %session_id, "joined session");
        self.reconciler.remember_session(session_id.clone());
        Ok(session_id)
    }

    pub async fn leave_session(&self) -> Result<bool, ClientError> {
        self.issue(Command::RequestLeave).await
    }

    pub async fn draw(&self, edit: A::Edit) -> Result<bool, ClientError> {
        self.issue(Command::BoardEdit(edit)).await
    }

    pub async fn reset_board(&self) -> Result<bool, ClientError> {
        self.issue(Command::BoardReset).await
    }

    pub async fn set_draw_permission(&self, enabled: bool) -> Result<bool, ClientError> {
        self.issue(Command::SetDrawPermission(enabled)).await
    }

    /// Locking makes the session private.
    pub async fn lock_room(&self, locked: bool) -> Result<bool, ClientError> {
        let mode = if locked {
            AccessMode::Private
        } else {
            AccessMode::Public
        };
        self.issue(Command::SetAccessMode(mode)).await
    }

    pub async fn set_capacity(&self, capacity: usize) -> Result<bool, ClientError> {
        self.issue(Command::SetCapacity(capacity)).await
    }

    pub async fn set_score(
        &self,
        participant_id: ParticipantId,
        score: i64,
    ) -> Result<bool, ClientError> {
        self.issue(Command::SetScore(ScoreUpdate {
            participant_id,
            score,
        }))
        .await
    }

    /// `Ok(true)` if sent and accepted, `Ok(false)` if there was no
    /// session to address.
    async fn issue(&self, command: Command<A::Edit>) -> Result<bool, ClientError> {
        let Some(session_id) = self.reconciler.session_id() else {
            tracing::debug!(command = command.name(), "no session, command not sent");
            return Ok(false);
        };
        let envelope = CommandEnvelope::new(Some(session_id.clone()), command);
        self.sink.send(envelope).await?;
        Ok(true)
    }
}
