//! Wire protocol for SketchBoard.
//!
//! This crate defines what clients and the server exchange:
//!
//! - **Identity types** ([`ParticipantId`], [`SessionId`], [`AreaId`]).
//! - **Session vocabulary** ([`Color`], [`AccessMode`], [`Stroke`],
//!   [`ScoreUpdate`]).
//! - **Commands** ([`Command`], [`CommandEnvelope`], [`CommandAck`]):
//!   the typed requests a participant sends to an area.
//! - **Frames** ([`Envelope`], [`ClientMessage`], [`ServerMessage`]):
//!   what actually travels over a connection.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes ↔ frames.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about session rules. It only fixes
//! the shapes on the wire, so both the server and client crates can
//! depend on it without depending on each other.
//!
//! ```text
//! Connection (bytes) → Protocol (Envelope) → Area (commands, snapshots)
//! ```

mod codec;
mod color;
mod command;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use color::Color;
pub use command::{Command, CommandAck, CommandEnvelope, ScoreUpdate, Stroke};
pub use error::ProtocolError;
pub use types::{
    AccessMode, AreaId, AreaListEntry, ClientMessage, Envelope, ParticipantId,
    ServerMessage, SessionId,
};
