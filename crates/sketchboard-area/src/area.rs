//! Area actor: a Tokio task that owns one [`AreaAuthority`].
//!
//! Everything that touches the session goes through the actor's channel,
//! so two commands for the same area never interleave.

use sketchboard_protocol::{AreaId, CommandAck, CommandEnvelope, ParticipantId};
use sketchboard_session::{Activity, SessionConfig, Snapshot};
use tokio::sync::{mpsc, oneshot};

use crate::{AreaAuthority, AreaError, AreaInfo, SnapshotSender};

/// Requests the area actor understands. Variants carrying a
/// `oneshot::Sender` expect a reply.
pub(crate) enum AreaCommand<A: Activity> {
    Submit {
        caller: ParticipantId,
        envelope: CommandEnvelope<A::Edit>,
        reply: oneshot::Sender<Result<CommandAck, AreaError>>,
    },
    Enter {
        observer: ParticipantId,
        sender: SnapshotSender<A>,
        reply: oneshot::Sender<()>,
    },
    Exit {
        observer: ParticipantId,
        reply: oneshot::Sender<()>,
    },
    Info {
        reply: oneshot::Sender<AreaInfo>,
    },
    Snapshot {
        reply: oneshot::Sender<Option<Snapshot<A>>>,
    },
    Shutdown,
}

/// Cheap-to-clone handle to a running area actor.
#[derive(Clone)]
pub struct AreaHandle<A: Activity> {
    area_id: AreaId,
    sender: mpsc::Sender<AreaCommand<A>>,
}

impl<A: Activity> AreaHandle<A> {
    pub fn area_id(&self) -> AreaId {
        self.area_id
    }

    /// Submits a command and waits for the authority's verdict.
    pub async fn submit(
        &self,
        caller: ParticipantId,
        envelope: CommandEnvelope<A::Edit>,
    ) -> Result<CommandAck, AreaError> {
        self.request(|reply| AreaCommand::Submit {
            caller,
            envelope,
            reply,
        })
        .await?
    }

    /// Registers `observer` to receive snapshots on `sender`.
    pub async fn enter(
        &self,
        observer: ParticipantId,
        sender: SnapshotSender<A>,
    ) -> Result<(), AreaError> {
        self.request(|reply| AreaCommand::Enter {
            observer,
            sender,
            reply,
        })
        .await
    }

    /// Unregisters `observer`, leaving the session if they were in it.
    pub async fn exit(&self, observer: ParticipantId) -> Result<(), AreaError> {
        self.request(|reply| AreaCommand::Exit { observer, reply })
            .await
    }

    pub async fn info(&self) -> Result<AreaInfo, AreaError> {
        self.request(|reply| AreaCommand::Info { reply }).await
    }

    /// The current snapshot, or `None` if no session was ever started.
    pub async fn snapshot(&self) -> Result<Option<Snapshot<A>>, AreaError> {
        self.request(|reply| AreaCommand::Snapshot { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), AreaError> {
        self.sender
            .send(AreaCommand::Shutdown)
            .await
            .map_err(|_| AreaError::Unavailable(self.area_id))
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> AreaCommand<A>,
    ) -> Result<T, AreaError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| AreaError::Unavailable(self.area_id))?;
        reply_rx
            .await
            .map_err(|_| AreaError::Unavailable(self.area_id))
    }
}

struct AreaActor<A: Activity> {
    authority: AreaAuthority<A>,
    receiver: mpsc::Receiver<AreaCommand<A>>,
}

impl<A: Activity> AreaActor<A> {
    async fn run(mut self) {
        let area_id = self.authority.area_id();
        tracing::info!(%area_id, "area actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                AreaCommand::Submit {
                    caller,
                    envelope,
                    reply,
                } => {
                    let result = self.authority.handle_command(caller, envelope);
                    let _ = reply.send(result);
                }
                AreaCommand::Enter {
                    observer,
                    sender,
                    reply,
                } => {
                    self.authority.add_observer(observer, sender);
                    let _ = reply.send(());
                }
                AreaCommand::Exit { observer, reply } => {
                    self.authority.remove_observer(observer);
                    let _ = reply.send(());
                }
                AreaCommand::Info { reply } => {
                    let _ = reply.send(self.authority.info());
                }
                AreaCommand::Snapshot { reply } => {
                    let _ = reply.send(self.authority.snapshot());
                }
                AreaCommand::Shutdown => {
                    tracing::info!(%area_id, "area shutting down");
                    break;
                }
            }
        }

        tracing::info!(%area_id, "area actor stopped");
    }
}

/// Spawns an area actor and returns its handle.
///
/// `channel_size` bounds the command queue; senders wait when it's full.
pub(crate) fn spawn_area<A: Activity>(
    area_id: AreaId,
    config: SessionConfig,
    channel_size: usize,
) -> AreaHandle<A> {
    let (tx, rx) = mpsc::channel(channel_size);
    let actor = AreaActor {
        authority: AreaAuthority::new(area_id, config),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    AreaHandle {
        area_id,
        sender: tx,
    }
}
