//! Structural marker: the full DDL text of the schema, stored in `meta`
//! and compared across startups. A mismatch means the table structure
//! changed outside the migration path, which is treated as structural
//! corruption.

use beacon_core::errors::BeaconResult;
use rusqlite::{params, Connection, OptionalExtension};

use crate::queries::maintenance;
use crate::to_storage_err;

const MARKER_KEY: &str = "schema_marker";

/// Result of comparing the stored marker against the live schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerCheck {
    /// No marker stored yet (fresh database or pre-marker version).
    Absent,
    Match,
    Mismatch,
}

/// Compare the stored marker with the current schema text.
pub fn check_marker(conn: &Connection) -> BeaconResult<MarkerCheck> {
    let stored = match read_stored(conn)? {
        None => return Ok(MarkerCheck::Absent),
        Some(text) => text,
    };
    if stored == maintenance::schema_text(conn)? {
        Ok(MarkerCheck::Match)
    } else {
        Ok(MarkerCheck::Mismatch)
    }
}

/// Recompute the marker from the live schema and persist it. Called
/// after migrations so the stored text always reflects the latest
/// structure.
pub fn store_current(conn: &Connection) -> BeaconResult<()> {
    let text = maintenance::schema_text(conn)?;
    conn.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![MARKER_KEY, text],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

fn read_stored(conn: &Connection) -> BeaconResult<Option<String>> {
    // A database that predates v001 has no meta table at all.
    let has_meta: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'meta'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    if has_meta.is_none() {
        return Ok(None);
    }

    conn.query_row(
        "SELECT value FROM meta WHERE key = ?1",
        params![MARKER_KEY],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}
