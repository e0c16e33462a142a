use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Tunables for batching and the retry schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Most events claimed into one batch.
    pub batch_max_events: usize,
    /// Soft cap on the payload bytes of one batch. A single event that
    /// exceeds it still ships alone.
    pub batch_max_bytes: u64,
    /// Pending-event count that triggers a flush ahead of the timer.
    pub pending_threshold: usize,
    /// Periodic flush interval in milliseconds.
    pub flush_interval_ms: u64,
    /// First retry delay in milliseconds.
    pub backoff_base_ms: u64,
    /// Ceiling on the retry delay in milliseconds.
    pub backoff_cap_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_max_events: DEFAULT_BATCH_MAX_EVENTS,
            batch_max_bytes: DEFAULT_BATCH_MAX_BYTES,
            pending_threshold: DEFAULT_PENDING_THRESHOLD,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_cap_ms: DEFAULT_BACKOFF_CAP_MS,
        }
    }
}
