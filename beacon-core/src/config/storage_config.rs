use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Tunables for the durable store underneath the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path. Relative paths resolve against the host's
    /// data directory.
    pub db_path: PathBuf,
    /// Total payload bytes the queue may retain before trimming.
    pub max_total_bytes: u64,
    /// Largest single payload accepted by `append`.
    pub max_event_bytes: u64,
    /// Number of read-only connections in the pool.
    pub read_pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            max_event_bytes: DEFAULT_MAX_EVENT_BYTES,
            read_pool_size: DEFAULT_READ_POOL_SIZE,
        }
    }
}
