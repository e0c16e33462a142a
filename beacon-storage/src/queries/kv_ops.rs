//! Typed key-value operations. Values are JSON in a TEXT column tagged
//! with a kind column; readbacks reassemble the typed value.

use beacon_core::errors::{BeaconResult, StorageError};
use beacon_core::models::AttributeValue;
use rusqlite::{params, Connection, OptionalExtension};

use crate::to_storage_err;

/// Insert or overwrite. An overwrite may change the kind; callers that
/// must preserve it check first (the profile layer does).
pub fn put(conn: &Connection, key: &str, value: &AttributeValue) -> BeaconResult<()> {
    let json = value.to_json()?;
    conn.execute(
        "INSERT INTO kv (key, kind, value) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET kind = excluded.kind, value = excluded.value",
        params![key, value.kind(), json],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get(conn: &Connection, key: &str) -> BeaconResult<Option<AttributeValue>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT kind, value FROM kv WHERE key = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    match row {
        None => Ok(None),
        Some((kind, json)) => match AttributeValue::from_parts(&kind, &json) {
            Some(value) => Ok(Some(value)),
            None => Err(StorageError::CorruptionDetected {
                details: format!("kv row '{key}' does not parse as {kind}"),
            }
            .into()),
        },
    }
}

pub fn delete(conn: &Connection, key: &str) -> BeaconResult<bool> {
    let n = conn
        .execute("DELETE FROM kv WHERE key = ?1", params![key])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n > 0)
}

/// Add `delta` to a counter, creating it when absent. Read-modify-write
/// inside one transaction so concurrent increments cannot lose updates.
pub fn increment(conn: &Connection, key: &str, delta: i64) -> BeaconResult<i64> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("increment begin: {e}")))?;

    match increment_inner(&tx, key, delta) {
        Ok(value) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("increment commit: {e}")))?;
            Ok(value)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

fn increment_inner(conn: &Connection, key: &str, delta: i64) -> BeaconResult<i64> {
    match get(conn, key)? {
        None => {
            put(conn, key, &AttributeValue::Counter(delta))?;
            Ok(delta)
        }
        Some(AttributeValue::Counter(current)) => {
            let next = current.saturating_add(delta);
            put(conn, key, &AttributeValue::Counter(next))?;
            Ok(next)
        }
        Some(other) => Err(StorageError::KindMismatch {
            key: key.to_string(),
            stored: other.kind().to_string(),
            requested: "counter".to_string(),
        }
        .into()),
    }
}

/// Union `values` into a string set, creating it when absent. Returns
/// the resulting set size.
pub fn merge_set(conn: &Connection, key: &str, values: &[String]) -> BeaconResult<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("merge_set begin: {e}")))?;

    match merge_set_inner(&tx, key, values) {
        Ok(size) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("merge_set commit: {e}")))?;
            Ok(size)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

fn merge_set_inner(conn: &Connection, key: &str, values: &[String]) -> BeaconResult<usize> {
    let merged = match get(conn, key)? {
        None => values.iter().cloned().collect(),
        Some(AttributeValue::StringSet(mut set)) => {
            set.extend(values.iter().cloned());
            set
        }
        Some(other) => {
            return Err(StorageError::KindMismatch {
                key: key.to_string(),
                stored: other.kind().to_string(),
                requested: "string_set".to_string(),
            }
            .into())
        }
    };
    let size = merged.len();
    put(conn, key, &AttributeValue::StringSet(merged))?;
    Ok(size)
}
