//! In-process command sink: an [`AreaClient`](sketchboard_client::AreaClient)
//! talking straight to an area actor, no socket in between.
//!
//! Used by bots and tests that live in the server process.

use sketchboard_area::{AreaError, AreaHandle};
use sketchboard_client::{ClientError, CommandSink};
use sketchboard_protocol::{CommandAck, CommandEnvelope, ParticipantId};
use sketchboard_session::Activity;

/// Submits commands to one area as one participant.
pub struct LocalSink<A: Activity> {
    caller: ParticipantId,
    area: AreaHandle<A>,
}

impl<A: Activity> LocalSink<A> {
    pub fn new(caller: ParticipantId, area: AreaHandle<A>) -> Self {
        Self { caller, area }
    }
}

impl<A: Activity> CommandSink<A::Edit> for LocalSink<A> {
    async fn send(&self, envelope: CommandEnvelope<A::Edit>) -> Result<CommandAck, ClientError> {
        self.area
            .submit(self.caller, envelope)
            .await
            .map_err(rejection)
    }
}

/// The same shape a remote client gets from an `Error` frame.
pub(crate) fn rejection(err: AreaError) -> ClientError {
    match err {
        AreaError::Unavailable(_) => ClientError::Closed,
        other => ClientError::Rejected {
            code: other.code(),
            kind: other.kind().to_string(),
            message: other.to_string(),
        },
    }
}
