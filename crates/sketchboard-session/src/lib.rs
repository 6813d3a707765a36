//! Authoritative session state for SketchBoard.
//!
//! A session is a fixed shell (membership, capacity, access mode, leader,
//! scores, draw permission) around an activity payload. The shell rules
//! live in [`SessionEngine`]; the payload implements [`Activity`].
//!
//! # Key types
//!
//! - [`Activity`]: what a session hosts (edit, reset, serialize)
//! - [`SketchBoard`]: the drawing-board activity
//! - [`SessionEngine`]: join/leave/mutate with all invariants enforced
//! - [`SessionState`] / [`Snapshot`]: the value broadcast to observers
//! - [`SessionConfig`]: capacity and background color defaults
//!
//! Nothing here is async or shared. The area layer above owns exactly one
//! engine per area and serializes every call into it.

mod activity;
mod board;
mod config;
mod engine;
mod error;
mod state;

pub use activity::Activity;
pub use board::{Board, SketchBoard};
pub use config::{SessionConfig, BOARD_HEIGHT, BOARD_WIDTH, DEFAULT_CAPACITY};
pub use engine::{Departure, SessionEngine};
pub use error::SessionError;
pub use state::{ParticipantScore, Scores, SessionState, Snapshot};
