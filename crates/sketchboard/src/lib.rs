//! # SketchBoard
//!
//! Shared sketch boards: participants in an area draw on one board,
//! the server keeps the only authoritative copy, and every observer gets
//! the full session after each change.
//!
//! The layers, bottom up:
//!
//! ```text
//! sketchboard-protocol   ids, commands, frames, codec
//! sketchboard-session    session rules (join/leave/leader/board/scores)
//! sketchboard-area       one actor per area, authorization, broadcast
//! sketchboard-client     snapshot diffing and command issuing
//! sketchboard-transport  WebSocket connections
//! sketchboard            this crate: the server and glue
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sketchboard::prelude::*;
//!
//! struct AnyoneIsOne;
//!
//! impl Authenticator for AnyoneIsOne {
//!     async fn authenticate(&self, _token: &str) -> Result<ParticipantId, AuthError> {
//!         Ok(ParticipantId(1))
//!     }
//! }
//!
//! # async fn run() -> Result<(), SketchBoardError> {
//! let server = SketchBoardServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .areas(2)
//!     .build::<SketchBoard, _>(AnyoneIsOne)
//!     .await?;
//! server.run().await
//! # }
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod handler;
mod local;
mod server;

pub use auth::{AuthError, Authenticator};
pub use error::SketchBoardError;
pub use local::LocalSink;
pub use server::{SketchBoardServer, SketchBoardServerBuilder, PROTOCOL_VERSION};

/// Everything needed to run a server or drive an in-process client.
pub mod prelude {
    pub use crate::{
        AuthError, Authenticator, LocalSink, SketchBoardError, SketchBoardServer,
        SketchBoardServerBuilder, PROTOCOL_VERSION,
    };
    pub use sketchboard_area::{AreaConfig, AreaError, AreaHandle, AreaManager};
    pub use sketchboard_client::{
        AreaClient, ClientError, CommandSink, IdentitySource, RawIds, Reconciler,
        ReconcilerEvent,
    };
    pub use sketchboard_protocol::{
        AccessMode, AreaId, Color, Command, CommandEnvelope, ParticipantId, SessionId, Stroke,
    };
    pub use sketchboard_session::{
        Activity, Board, SessionConfig, SessionError, SketchBoard, Snapshot,
    };
}
