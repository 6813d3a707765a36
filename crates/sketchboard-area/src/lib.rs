//! Area layer for SketchBoard.
//!
//! An area hosts at most one live session. Every area runs as an
//! isolated Tokio task (actor) that owns an [`AreaAuthority`]; commands
//! for one area are applied strictly one after another, while different
//! areas run in parallel.
//!
//! # Key types
//!
//! - [`AreaAuthority`]: validates and applies commands, broadcasts
//!   snapshots (synchronous, no I/O)
//! - [`AreaHandle`]: send requests to a running area actor
//! - [`AreaManager`]: creates/destroys areas, tracks occupants, routes
//! - [`AreaError`]: everything a command can fail with

mod area;
mod authority;
mod config;
mod error;
mod manager;

pub use area::AreaHandle;
pub use authority::{AreaAuthority, AreaInfo, SnapshotSender};
pub use config::AreaConfig;
pub use error::AreaError;
pub use manager::AreaManager;
