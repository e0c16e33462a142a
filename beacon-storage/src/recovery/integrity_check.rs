//! PRAGMA integrity_check, detect corruption early.

use beacon_core::errors::BeaconResult;
use rusqlite::Connection;

use crate::queries::maintenance;

/// Run integrity check. Returns true if the database is healthy.
pub fn check_integrity(conn: &Connection) -> BeaconResult<bool> {
    maintenance::integrity_check(conn)
}
