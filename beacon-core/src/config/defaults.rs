//! Default values for every tunable in [`BeaconConfig`](super::BeaconConfig).
//!
//! Kept in one place so the serde `default` attributes and the `Default`
//! impls cannot drift apart.

// --- Storage ---

/// Database file name, resolved relative to the host-supplied data directory.
pub const DEFAULT_DB_PATH: &str = "beacon.db";

/// Cap on the total payload bytes retained in the queue (5 MiB).
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 5_242_880;

/// Largest single event payload accepted (256 KiB).
pub const DEFAULT_MAX_EVENT_BYTES: u64 = 262_144;

/// Read-only connections kept in the pool.
pub const DEFAULT_READ_POOL_SIZE: usize = 4;

// --- Dispatch ---

/// Most events claimed into one batch.
pub const DEFAULT_BATCH_MAX_EVENTS: usize = 100;

/// Soft cap on the payload bytes of one batch (1 MiB).
pub const DEFAULT_BATCH_MAX_BYTES: u64 = 1_048_576;

/// Pending events that trigger an early flush.
pub const DEFAULT_PENDING_THRESHOLD: usize = 20;

/// Periodic flush interval (90 s).
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 90_000;

/// First retry delay after a transient failure (1 s).
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Ceiling on the retry delay (5 min).
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 300_000;

// --- Session ---

/// Idle gap after which the next event starts a new session (10 s).
pub const DEFAULT_INACTIVITY_GAP_MS: i64 = 10_000;

// --- Network ---

/// Whole-request timeout for one report upload (30 s).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
