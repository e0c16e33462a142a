use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Tunables for session boundary detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle gap in milliseconds after which the next event starts a
    /// new session.
    pub inactivity_gap_ms: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_gap_ms: DEFAULT_INACTIVITY_GAP_MS,
        }
    }
}
