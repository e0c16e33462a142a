//! Schema migrations using PRAGMA user_version.
//!
//! Each step commits its data changes and the version bump inside one
//! IMMEDIATE transaction, so a crash mid-step rolls the whole step back.
//! Steps are additionally re-runnable: DDL uses IF NOT EXISTS and column
//! additions probe PRAGMA table_info first.

pub mod v001_initial;
pub mod v002_delivery;
pub mod v003_kv_kinds;

use beacon_core::errors::StorageError;
use rusqlite::Connection;

/// Schema version a fully migrated database reports.
pub const LATEST_VERSION: u32 = 3;

type MigrationFn = fn(&Connection) -> rusqlite::Result<()>;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let migrations: &[(u32, MigrationFn)] = &[
        (1, v001_initial::apply),
        (2, v002_delivery::apply),
        (3, v003_kv_kinds::apply),
    ];

    let current = current_version(conn)?;
    for (version, apply) in migrations {
        if current < *version {
            run_step(conn, *version, *apply)?;
            tracing::info!(version, "storage: applied migration");
        }
    }

    Ok(())
}

/// Get the current schema version.
pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })
}

fn run_step(conn: &Connection, version: u32, apply: MigrationFn) -> Result<(), StorageError> {
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| step_err(version, e))?;

    let applied = apply(conn).and_then(|()| conn.pragma_update(None, "user_version", version));
    match applied {
        Ok(()) => conn
            .execute_batch("COMMIT")
            .map_err(|e| step_err(version, e)),
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(step_err(version, e))
        }
    }
}

fn step_err(version: u32, e: rusqlite::Error) -> StorageError {
    StorageError::MigrationFailed {
        version,
        reason: e.to_string(),
    }
}

/// Check whether a column already exists on a table.
pub(crate) fn column_exists(
    conn: &Connection,
    table: &str,
    column: &str,
) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
