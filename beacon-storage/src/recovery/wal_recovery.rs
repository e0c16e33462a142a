//! Attempt WAL checkpoint recovery on corruption.

use beacon_core::errors::BeaconResult;
use rusqlite::Connection;

/// Attempt to recover by forcing a WAL checkpoint.
pub fn attempt_wal_recovery(conn: &Connection) -> BeaconResult<bool> {
    match conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)") {
        Ok(()) => Ok(true),
        Err(e) => {
            tracing::warn!("storage: WAL checkpoint recovery failed: {e}");
            Ok(false)
        }
    }
}
