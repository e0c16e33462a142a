//! Startup recovery: integrity preflight, WAL checkpoint rescue,
//! structural marker comparison, and best-effort row repair.

pub mod integrity_check;
pub mod row_scan;
pub mod schema_marker;
pub mod wal_recovery;

use beacon_core::errors::BeaconResult;
use rusqlite::Connection;

use crate::to_storage_err;

/// Drop every user table and reset the migration record, leaving an
/// empty database the migration ladder rebuilds from scratch.
pub fn wipe_schema(conn: &Connection) -> BeaconResult<()> {
    let mut tables: Vec<String> = Vec::new();
    {
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        let mut rows = stmt.query([]).map_err(|e| to_storage_err(e.to_string()))?;
        while let Some(row) = rows.next().map_err(|e| to_storage_err(e.to_string()))? {
            tables.push(row.get(0).map_err(|e| to_storage_err(e.to_string()))?);
        }
    }

    for table in &tables {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS \"{table}\""))
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    conn.pragma_update(None, "user_version", 0)
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
