//! `SketchBoardServer` builder and accept loop.

use std::net::SocketAddr;
use std::sync::Arc;

use sketchboard_area::{AreaConfig, AreaManager};
use sketchboard_protocol::{AreaId, Codec, JsonCodec};
use sketchboard_session::{Activity, SessionConfig};
use sketchboard_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::handler::handle_connection;
use crate::{Authenticator, SketchBoardError};

/// Clients must send this in their handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// State shared by every connection task.
///
/// The manager lock is held only to look up or record things, never
/// across an area round-trip.
pub(crate) struct ServerState<A: Activity, Au: Authenticator, C: Codec> {
    pub(crate) areas: Mutex<AreaManager<A>>,
    pub(crate) auth: Au,
    pub(crate) codec: C,
    /// Reference point for `server_time` and frame timestamps.
    pub(crate) started: Instant,
}

impl<A: Activity, Au: Authenticator, C: Codec> ServerState<A, Au, C> {
    pub(crate) fn now_millis(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Configures and binds a [`SketchBoardServer`].
///
/// ```rust,ignore
/// let server = SketchBoardServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .areas(4)
///     .build::<SketchBoard, _>(my_auth)
///     .await?;
/// server.run().await
/// ```
#[derive(Debug, Clone)]
pub struct SketchBoardServerBuilder {
    bind_addr: String,
    areas: usize,
    session_config: SessionConfig,
    area_config: AreaConfig,
}

impl SketchBoardServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            areas: 1,
            session_config: SessionConfig::default(),
            area_config: AreaConfig::default(),
        }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// How many areas to open at startup.
    pub fn areas(mut self, count: usize) -> Self {
        self.areas = count;
        self
    }

    /// Defaults for every session the server creates.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn area_config(mut self, config: AreaConfig) -> Self {
        self.area_config = config;
        self
    }

    /// Binds the listener and opens the areas. Frames are JSON.
    pub async fn build<A: Activity, Au: Authenticator>(
        self,
        auth: Au,
    ) -> Result<SketchBoardServer<A, Au, JsonCodec>, SketchBoardError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let mut manager = AreaManager::new(self.session_config, self.area_config);
        for _ in 0..self.areas {
            manager.create_area();
        }

        let state = Arc::new(ServerState {
            areas: Mutex::new(manager),
            auth,
            codec: JsonCodec,
            started: Instant::now(),
        });

        Ok(SketchBoardServer { transport, state })
    }
}

impl Default for SketchBoardServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server. Call [`run`](Self::run) to start accepting.
pub struct SketchBoardServer<A: Activity, Au: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, Au, C>>,
}

impl<A, Au, C> SketchBoardServer<A, Au, C>
where
    A: Activity,
    Au: Authenticator,
    C: Codec,
{
    pub fn local_addr(&self) -> Result<SocketAddr, SketchBoardError> {
        Ok(self.transport.local_addr()?)
    }

    /// Ids of the areas open right now.
    pub async fn area_ids(&self) -> Vec<AreaId> {
        self.state.areas.lock().await.area_ids()
    }

    /// Accepts connections until the process ends, one task each.
    pub async fn run(mut self) -> Result<(), SketchBoardError> {
        tracing::info!("SketchBoard server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
