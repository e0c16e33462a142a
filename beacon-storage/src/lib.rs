//! # beacon-storage
//!
//! SQLite persistence for the Beacon telemetry SDK: the durable event
//! queue, the typed key-value store, and session rows, all in one
//! database file. A single serialized writer handles mutations while a
//! small pool of read-only connections serves queries.
//!
//! [`StorageEngine`] is the entry point. Opening it runs the startup
//! sequence: integrity preflight, schema migrations, malformed-row
//! repair, and stale in-flight recovery.

pub mod connection;
pub mod engine;
pub mod migrations;
pub mod queries;
pub mod recovery;

pub use engine::StorageEngine;

use beacon_core::errors::{BeaconError, StorageError};

/// Wrap a low-level SQLite failure message into the umbrella error.
pub(crate) fn to_storage_err(message: impl Into<String>) -> BeaconError {
    BeaconError::StorageError(StorageError::SqliteError {
        message: message.into(),
    })
}
