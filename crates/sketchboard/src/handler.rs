//! Per-connection handler.
//!
//! Each accepted connection gets its own task running this:
//!
//! 1. receive `Handshake`, check the version, authenticate
//! 2. send `HandshakeAck`
//! 3. loop over client frames and snapshot pushes, whichever comes first
//!
//! However the loop ends, the connection leaves the area it was in (and
//! with it the session, if it had joined).

use std::sync::Arc;
use std::time::Duration;

use sketchboard_area::{AreaError, SnapshotSender};
use sketchboard_protocol::{
    AreaId, AreaListEntry, ClientMessage, Codec, Envelope, ParticipantId, ProtocolError,
    ServerMessage,
};
use sketchboard_session::{Activity, Snapshot};
use sketchboard_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::{ServerState, PROTOCOL_VERSION};
use crate::{Authenticator, SketchBoardError};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// A connection that sends nothing (not even heartbeats) for this long
/// is dropped.
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

type Inbound<A> = Envelope<ClientMessage<<A as Activity>::Edit>>;

/// Leaves the connection's area when the handler exits, including on
/// panic. `Drop` can't await, so the cleanup runs as its own task.
struct AreaGuard<A: Activity, Au: Authenticator, C: Codec> {
    participant_id: ParticipantId,
    area: Option<AreaId>,
    state: Arc<ServerState<A, Au, C>>,
}

impl<A: Activity, Au: Authenticator, C: Codec> Drop for AreaGuard<A, Au, C> {
    fn drop(&mut self) {
        let Some(area_id) = self.area.take() else {
            return;
        };
        let participant_id = self.participant_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(e) = leave_area(&state, participant_id, area_id).await {
                tracing::debug!(%participant_id, %area_id, error = %e, "cleanup exit failed");
            }
        });
    }
}

/// Sequenced, timestamped writes to one connection.
struct Outbox<'a, A: Activity, Au: Authenticator, C: Codec> {
    conn: &'a WebSocketConnection,
    state: &'a ServerState<A, Au, C>,
    seq: u64,
}

impl<A: Activity, Au: Authenticator, C: Codec> Outbox<'_, A, Au, C> {
    async fn send(&mut self, payload: ServerMessage<Snapshot<A>>) -> Result<(), SketchBoardError> {
        let envelope = Envelope::new(self.seq, self.state.now_millis(), payload);
        self.seq += 1;
        let bytes = self.state.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn error(
        &mut self,
        code: u16,
        kind: &str,
        message: impl Into<String>,
    ) -> Result<(), SketchBoardError> {
        self.send(ServerMessage::Error {
            code,
            kind: kind.to_string(),
            message: message.into(),
        })
        .await
    }

    async fn area_error(&mut self, err: &AreaError) -> Result<(), SketchBoardError> {
        self.error(err.code(), err.kind(), err.to_string()).await
    }
}

pub(crate) async fn handle_connection<A, Au, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, Au, C>>,
) -> Result<(), SketchBoardError>
where
    A: Activity,
    Au: Authenticator,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let mut out = Outbox {
        conn: &conn,
        state: &state,
        seq: 0,
    };
    let participant_id = perform_handshake(&conn, &mut out).await?;
    tracing::info!(%conn_id, %participant_id, "participant authenticated");

    let (snapshot_tx, mut snapshot_rx) = mpsc::unbounded_channel();
    let mut guard = AreaGuard {
        participant_id,
        area: None,
        state: Arc::clone(&state),
    };

    loop {
        tokio::select! {
            frame = tokio::time::timeout(IDLE_TIMEOUT, conn.recv()) => {
                let data = match frame {
                    Ok(Ok(Some(data))) => data,
                    Ok(Ok(None)) => {
                        tracing::info!(%participant_id, "connection closed cleanly");
                        break;
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(%participant_id, error = %e, "recv error");
                        break;
                    }
                    Err(_) => {
                        tracing::info!(%participant_id, "connection timed out");
                        break;
                    }
                };

                let envelope: Inbound<A> = match state.codec.decode(&data) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::debug!(%participant_id, error = %e, "failed to decode frame");
                        out.error(400, "InvalidMessage", e.to_string()).await?;
                        continue;
                    }
                };

                let open = handle_message(
                    envelope.payload,
                    participant_id,
                    &snapshot_tx,
                    &mut snapshot_rx,
                    &mut guard,
                    &mut out,
                )
                .await?;
                if !open {
                    break;
                }
            }
            Some(snapshot) = snapshot_rx.recv() => {
                if let Some(area_id) = guard.area {
                    out.send(ServerMessage::Snapshot { area_id, snapshot }).await?;
                }
            }
        }
    }

    // guard drops here and takes the participant out of their area
    Ok(())
}

async fn perform_handshake<A, Au, C>(
    conn: &WebSocketConnection,
    out: &mut Outbox<'_, A, Au, C>,
) -> Result<ParticipantId, SketchBoardError>
where
    A: Activity,
    Au: Authenticator,
    C: Codec,
{
    let state = out.state;
    let data = match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before handshake".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Inbound<A> = match state.codec.decode(&data) {
        Ok(envelope) => envelope,
        Err(e) => {
            out.error(400, "InvalidMessage", e.to_string()).await?;
            return Err(e.into());
        }
    };

    let ClientMessage::Handshake { version, token } = envelope.payload else {
        out.error(400, "InvalidMessage", "expected Handshake").await?;
        return Err(ProtocolError::InvalidMessage("first message must be Handshake".into()).into());
    };

    if version != PROTOCOL_VERSION {
        out.error(
            400,
            "VersionMismatch",
            format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let participant_id = match state.auth.authenticate(token.as_deref().unwrap_or("")).await {
        Ok(participant_id) => participant_id,
        Err(e) => {
            out.error(401, "Unauthorized", e.to_string()).await?;
            return Err(e.into());
        }
    };

    let server_time = state.now_millis();
    out.send(ServerMessage::HandshakeAck {
        participant_id,
        server_time,
    })
    .await?;
    Ok(participant_id)
}

/// Handles one client frame. Returns `false` when the connection should
/// close.
async fn handle_message<A, Au, C>(
    msg: ClientMessage<A::Edit>,
    participant_id: ParticipantId,
    snapshots: &SnapshotSender<A>,
    pending: &mut mpsc::UnboundedReceiver<Snapshot<A>>,
    guard: &mut AreaGuard<A, Au, C>,
    out: &mut Outbox<'_, A, Au, C>,
) -> Result<bool, SketchBoardError>
where
    A: Activity,
    Au: Authenticator,
    C: Codec,
{
    let state = out.state;

    match msg {
        ClientMessage::Heartbeat { client_time } => {
            out.send(ServerMessage::HeartbeatAck {
                client_time,
                server_time: state.now_millis(),
            })
            .await?;
        }

        ClientMessage::ListAreas => {
            let handles = state.areas.lock().await.area_handles();
            let mut areas = Vec::with_capacity(handles.len());
            for handle in &handles {
                if let Ok(info) = handle.info().await {
                    areas.push(AreaListEntry::from(info));
                }
            }
            areas.sort_by_key(|entry| entry.area_id);
            out.send(ServerMessage::AreaList { areas }).await?;
        }

        ClientMessage::EnterArea { area_id } => {
            let result = match guard.area {
                Some(current) => Err(AreaError::AlreadyInArea(participant_id, current)),
                None => enter_area(state, participant_id, area_id, snapshots.clone()).await,
            };
            match result {
                Ok(()) => {
                    guard.area = Some(area_id);
                    tracing::info!(%participant_id, %area_id, "entered area");
                    out.send(ServerMessage::AreaEntered { area_id }).await?;
                }
                Err(e) => out.area_error(&e).await?,
            }
        }

        ClientMessage::ExitArea => match guard.area.take() {
            Some(area_id) => {
                if let Err(e) = leave_area(state, participant_id, area_id).await {
                    tracing::debug!(%participant_id, %area_id, error = %e, "exit failed");
                }
                // The area can't push any more; what's queued is stale.
                while pending.try_recv().is_ok() {}
                tracing::info!(%participant_id, %area_id, "exited area");
            }
            None => out.area_error(&AreaError::NotInArea(participant_id)).await?,
        },

        // Commands only go to the area this connection is in, so the guard
        // can always take the participant back out of its session.
        ClientMessage::Command { area_id, command } => {
            let result = if guard.area != Some(area_id) {
                Err(AreaError::NotInArea(participant_id))
            } else {
                let handle = state.areas.lock().await.handle(area_id);
                match handle {
                    Ok(handle) => handle.submit(participant_id, command).await,
                    Err(e) => Err(e),
                }
            };
            match result {
                Ok(ack) => out.send(ServerMessage::CommandAck { area_id, ack }).await?,
                Err(e) => out.area_error(&e).await?,
            }
        }

        ClientMessage::Disconnect { reason } => {
            tracing::info!(%participant_id, %reason, "client disconnected");
            return Ok(false);
        }

        ClientMessage::Handshake { .. } => {
            out.error(400, "InvalidMessage", "already handshaken").await?;
        }
    }

    Ok(true)
}

/// Records the occupancy, then registers with the area. The manager lock
/// is released before talking to the area.
async fn enter_area<A, Au, C>(
    state: &ServerState<A, Au, C>,
    participant_id: ParticipantId,
    area_id: AreaId,
    sender: SnapshotSender<A>,
) -> Result<(), AreaError>
where
    A: Activity,
    Au: Authenticator,
    C: Codec,
{
    let handle = {
        let mut areas = state.areas.lock().await;
        areas.track_occupant(participant_id, area_id)?;
        areas.handle(area_id)?
    };
    if let Err(e) = handle.enter(participant_id, sender).await {
        state.areas.lock().await.untrack_occupant(participant_id);
        return Err(e);
    }
    Ok(())
}

async fn leave_area<A, Au, C>(
    state: &ServerState<A, Au, C>,
    participant_id: ParticipantId,
    area_id: AreaId,
) -> Result<(), AreaError>
where
    A: Activity,
    Au: Authenticator,
    C: Codec,
{
    let handle = {
        let mut areas = state.areas.lock().await;
        if areas.occupant_area(participant_id) == Some(area_id) {
            areas.untrack_occupant(participant_id);
        }
        areas.handle(area_id)?
    };
    handle.exit(participant_id).await
}
