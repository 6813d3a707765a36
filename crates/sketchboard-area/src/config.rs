//! Area actor settings.

use serde::{Deserialize, Serialize};

/// Configuration shared by every area a manager spawns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaConfig {
    /// Bound of each actor's command channel. Senders wait when it is
    /// full.
    pub channel_size: usize,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self { channel_size: 64 }
    }
}
