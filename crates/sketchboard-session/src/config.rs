//! Deployment-wide constants and per-session defaults.

use serde::{Deserialize, Serialize};
use sketchboard_protocol::Color;

/// Board columns. Fixed for every session; never negotiated.
pub const BOARD_WIDTH: usize = 100;

/// Board rows.
pub const BOARD_HEIGHT: usize = 40;

/// Participant limit a fresh session starts with.
pub const DEFAULT_CAPACITY: usize = 5;

/// Defaults applied whenever a session is created.
///
/// Override on the server builder; individual sessions can still change
/// their capacity later through the leader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Starting participant limit. Must be at least 1.
    pub capacity: usize,

    /// Color every cell holds after a reset.
    pub background_color: Color,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            background_color: Color::WHITE,
        }
    }
}
