//! StorageEngine: owns the connection manager, runs the startup
//! sequence (integrity preflight, marker check, migrations, row
//! repair), and implements the storage traits.

use std::fs;
use std::path::Path;

use beacon_core::config::StorageConfig;
use beacon_core::constants::MAX_BATCH_EVENTS;
use beacon_core::errors::{BeaconResult, ValidationError};
use beacon_core::events::{Batch, NewEvent};
use beacon_core::models::{AttributeValue, SessionRecord, StoreHealth};
use beacon_core::traits::{IEventStorage, IKeyValueStorage, ISessionStorage};
use rusqlite::Connection;

use crate::connection::DatabaseManager;
use crate::migrations;
use crate::queries::{event_ops, kv_ops, maintenance, session_ops};
use crate::recovery::schema_marker::MarkerCheck;
use crate::recovery::{self, integrity_check, row_scan, schema_marker, wal_recovery};
use crate::to_storage_err;

/// Closed sessions kept around for diagnostics.
const SESSION_KEEP: usize = 20;

/// The storage engine. Every subsystem shares one instance behind an
/// `Arc`; mutations serialize through the writer connection and reads
/// go to the pool.
pub struct StorageEngine {
    db: DatabaseManager,
    max_total_bytes: u64,
    max_event_bytes: u64,
    health: StoreHealth,
}

impl StorageEngine {
    /// Open the store and run the full startup sequence. Corruption is
    /// always resolved locally (repair or recreate), never returned to
    /// the caller; what happened is reported via [`StorageEngine::health`].
    pub fn open(config: &StorageConfig) -> BeaconResult<Self> {
        let path = config.db_path.as_path();
        let mut recreated = preflight(path)?;

        let db = match DatabaseManager::open(path, config.read_pool_size) {
            Ok(db) => db,
            Err(e) => {
                // The file was damaged in a way the preflight connection
                // could not see. Last resort: start over from empty.
                tracing::warn!(error = %e, "storage: open failed, recreating database");
                remove_database_files(path)?;
                recreated = true;
                DatabaseManager::open(path, config.read_pool_size)?
            }
        };

        let max_total_bytes = config.max_total_bytes;
        let max_event_bytes = config.max_event_bytes;

        let (rebuilt, dropped_rows) = db.with_writer(|conn| {
            let mut rebuilt = false;

            if schema_marker::check_marker(conn)? == MarkerCheck::Mismatch {
                tracing::warn!("storage: schema marker mismatch, rebuilding schema");
                recovery::wipe_schema(conn)?;
                rebuilt = true;
            }

            if let Err(e) = migrations::run_migrations(conn) {
                tracing::warn!(error = %e, "storage: migration failed, rebuilding schema");
                recovery::wipe_schema(conn)?;
                migrations::run_migrations(conn)?;
                rebuilt = true;
            }

            let dropped = row_scan::repair_rows(conn, max_event_bytes)?;

            let reset = event_ops::reset_in_flight(conn)?;
            if reset > 0 {
                tracing::info!(reset, "storage: restored stale in-flight events to pending");
            }

            let trimmed = event_ops::trim_to_cap(conn, max_total_bytes)?;
            if trimmed > 0 {
                maintenance::incremental_vacuum(conn)?;
            }
            session_ops::prune_sessions(conn, SESSION_KEEP)?;

            schema_marker::store_current(conn)?;
            Ok((rebuilt, dropped))
        })?;

        let health = if recreated || rebuilt {
            StoreHealth::Recreated
        } else if dropped_rows > 0 {
            StoreHealth::Repaired { dropped_rows }
        } else {
            StoreHealth::Healthy
        };

        Ok(Self {
            db,
            max_total_bytes,
            max_event_bytes,
            health,
        })
    }

    /// What the startup sequence had to do to make the store usable.
    pub fn health(&self) -> StoreHealth {
        self.health
    }

    /// Checkpoint, optimize, and release the connections.
    pub fn close(self) -> BeaconResult<()> {
        self.db.checkpoint()?;
        self.db.close()
    }
}

/// Check an existing file before the manager opens it. Returns whether
/// the file had to be recreated.
fn preflight(path: &Path) -> BeaconResult<bool> {
    if !path.exists() {
        return Ok(false);
    }

    let conn = match Connection::open(path) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(error = %e, "storage: preflight open failed, recreating database");
            remove_database_files(path)?;
            return Ok(true);
        }
    };

    if matches!(integrity_check::check_integrity(&conn), Ok(true)) {
        return Ok(false);
    }

    tracing::warn!(
        path = %path.display(),
        "storage: integrity check failed, attempting WAL recovery"
    );
    let recovered = wal_recovery::attempt_wal_recovery(&conn)?
        && matches!(integrity_check::check_integrity(&conn), Ok(true));
    if recovered {
        tracing::info!("storage: WAL recovery succeeded");
        return Ok(false);
    }

    drop(conn);
    remove_database_files(path)?;
    tracing::warn!(path = %path.display(), "storage: recreated unrecoverable database");
    Ok(true)
}

fn remove_database_files(path: &Path) -> BeaconResult<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        let sibling = Path::new(&name);
        match fs::remove_file(sibling) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(to_storage_err(format!(
                    "remove {}: {e}",
                    sibling.display()
                )))
            }
        }
    }
    Ok(())
}

impl IEventStorage for StorageEngine {
    fn append(&self, event: NewEvent) -> BeaconResult<i64> {
        let size = event.payload.len();
        if size as u64 > self.max_event_bytes {
            return Err(ValidationError::PayloadTooLarge {
                size,
                limit: self.max_event_bytes as usize,
            }
            .into());
        }
        if event.timestamp_ms <= 0 {
            return Err(ValidationError::InvalidTimestamp {
                timestamp_ms: event.timestamp_ms,
            }
            .into());
        }
        self.db
            .with_writer(|conn| event_ops::append_event(conn, &event, self.max_total_bytes))
    }

    fn claim_batch(&self, max_events: usize, max_bytes: u64) -> BeaconResult<Batch> {
        let max_events = max_events.min(MAX_BATCH_EVENTS);
        self.db
            .with_writer(|conn| event_ops::claim_batch(conn, max_events, max_bytes))
    }

    fn acknowledge(&self, ids: &[i64]) -> BeaconResult<usize> {
        self.db.with_writer(|conn| event_ops::acknowledge(conn, ids))
    }

    fn release(&self, ids: &[i64]) -> BeaconResult<usize> {
        self.db.with_writer(|conn| event_ops::release(conn, ids))
    }

    fn trim_to_cap(&self) -> BeaconResult<usize> {
        self.db
            .with_writer(|conn| event_ops::trim_to_cap(conn, self.max_total_bytes))
    }

    fn pending_count(&self) -> BeaconResult<usize> {
        self.db.with_reader(event_ops::pending_count)
    }

    fn total_payload_bytes(&self) -> BeaconResult<u64> {
        self.db.with_reader(event_ops::total_payload_bytes)
    }
}

impl IKeyValueStorage for StorageEngine {
    fn put(&self, key: &str, value: &AttributeValue) -> BeaconResult<()> {
        self.db.with_writer(|conn| kv_ops::put(conn, key, value))
    }

    fn get(&self, key: &str) -> BeaconResult<Option<AttributeValue>> {
        self.db.with_reader(|conn| kv_ops::get(conn, key))
    }

    fn delete(&self, key: &str) -> BeaconResult<bool> {
        self.db.with_writer(|conn| kv_ops::delete(conn, key))
    }

    fn increment(&self, key: &str, delta: i64) -> BeaconResult<i64> {
        self.db
            .with_writer(|conn| kv_ops::increment(conn, key, delta))
    }

    fn merge_set(&self, key: &str, values: &[String]) -> BeaconResult<usize> {
        self.db
            .with_writer(|conn| kv_ops::merge_set(conn, key, values))
    }
}

impl ISessionStorage for StorageEngine {
    fn open_session(&self, session: &SessionRecord) -> BeaconResult<()> {
        self.db
            .with_writer(|conn| session_ops::open_session(conn, session))
    }

    fn touch_session(&self, id: &str, last_event_at_ms: i64) -> BeaconResult<()> {
        self.db
            .with_writer(|conn| session_ops::touch_session(conn, id, last_event_at_ms))
    }

    fn close_session(&self, id: &str, ended_at_ms: i64) -> BeaconResult<()> {
        self.db
            .with_writer(|conn| session_ops::close_session(conn, id, ended_at_ms))
    }

    fn latest_session(&self) -> BeaconResult<Option<SessionRecord>> {
        self.db.with_reader(session_ops::latest_session)
    }
}
