//! Connection management: write-serialized + read-pooled.

pub mod pool;
pub mod pragmas;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use beacon_core::errors::{BeaconResult, StorageError};
use rusqlite::Connection;

use crate::to_storage_err;

use self::pool::ReadPool;
use self::pragmas::{apply_pragmas, optimize_on_close, verify_wal_mode};

/// Manages the single write connection and the read connection pool.
///
/// Opening applies pragmas only; migrations and recovery are driven by
/// the engine, which needs to inspect the schema before changing it.
pub struct DatabaseManager {
    writer: Mutex<Connection>,
    readers: ReadPool,
    path: PathBuf,
}

impl DatabaseManager {
    /// Open a database at the given path and apply pragmas.
    pub fn open(path: &Path, read_pool_size: usize) -> Result<Self, StorageError> {
        let writer = Connection::open(path).map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
        apply_pragmas(&writer)?;
        if !verify_wal_mode(&writer)? {
            tracing::warn!(path = %path.display(), "journal mode is not WAL");
        }

        // The writer open above created the file, so read-only opens succeed.
        let readers = ReadPool::open(path, read_pool_size)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            path: path.to_path_buf(),
        })
    }

    /// Execute a write operation with the serialized writer connection.
    pub fn with_writer<F, T>(&self, f: F) -> BeaconResult<T>
    where
        F: FnOnce(&Connection) -> BeaconResult<T>,
    {
        let guard = self
            .writer
            .lock()
            .map_err(|_| to_storage_err("write lock poisoned"))?;
        f(&guard)
    }

    /// Execute a read operation with a pooled read connection.
    pub fn with_reader<F, T>(&self, f: F) -> BeaconResult<T>
    where
        F: FnOnce(&Connection) -> BeaconResult<T>,
    {
        self.readers.with_conn(f)
    }

    /// Run a WAL checkpoint (TRUNCATE mode).
    pub fn checkpoint(&self) -> BeaconResult<()> {
        self.with_writer(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(|e| to_storage_err(e.to_string()))
        })
    }

    /// Get the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Optimize and release the connections.
    pub fn close(self) -> BeaconResult<()> {
        let guard = self
            .writer
            .lock()
            .map_err(|_| to_storage_err("write lock poisoned"))?;
        optimize_on_close(&guard)?;
        Ok(())
    }
}
