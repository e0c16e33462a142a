//! Database-wide maintenance queries.

use beacon_core::errors::BeaconResult;
use rusqlite::Connection;

use crate::to_storage_err;

/// Run PRAGMA integrity_check. Returns true if the database is healthy.
pub fn integrity_check(conn: &Connection) -> BeaconResult<bool> {
    let result: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(result.eq_ignore_ascii_case("ok"))
}

/// Return free pages to the filesystem after large deletes.
pub fn incremental_vacuum(conn: &Connection) -> BeaconResult<()> {
    conn.execute_batch("PRAGMA incremental_vacuum;")
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Concatenated DDL of all user tables and indexes, ordered by name.
/// This is the structural marker text compared across startups.
pub fn schema_text(conn: &Connection) -> BeaconResult<String> {
    let mut stmt = conn
        .prepare(
            "SELECT sql FROM sqlite_master
             WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query([])
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = String::new();
    while let Some(row) = rows.next().map_err(|e| to_storage_err(e.to_string()))? {
        let sql: String = row.get(0).map_err(|e| to_storage_err(e.to_string()))?;
        out.push_str(&sql);
        out.push('\n');
    }
    Ok(out)
}
