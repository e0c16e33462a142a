//! Best-effort row repair: drop rows that fail invariant checks so the
//! rest of the store keeps working.

use beacon_core::errors::BeaconResult;
use beacon_core::events::{EventKind, EventState};
use beacon_core::models::{AppInfo, AttributeValue};
use rusqlite::{params, Connection};

use crate::to_storage_err;

/// Scan every table for malformed rows and drop them. Returns the total
/// number of rows removed.
pub fn repair_rows(conn: &Connection, max_event_bytes: u64) -> BeaconResult<usize> {
    let mut dropped = 0usize;
    dropped += scan_events(conn, max_event_bytes)?;
    dropped += scan_kv(conn)?;
    dropped += scan_sessions(conn)?;
    dropped += scan_orphan_events(conn)?;
    if dropped > 0 {
        tracing::warn!(dropped, "storage: dropped malformed rows during repair");
    }
    Ok(dropped)
}

/// Event rows: size must agree with the payload, timestamps must be
/// positive, kind and state must be known, payload must fit the cap.
fn scan_events(conn: &Connection, max_event_bytes: u64) -> BeaconResult<usize> {
    let kinds = quoted_list(EventKind::ALL.iter().map(|k| k.as_str()));
    let states = quoted_list(
        [EventState::Pending, EventState::InFlight]
            .iter()
            .map(|s| s.as_str()),
    );

    conn.execute(
        &format!(
            "DELETE FROM events WHERE
                payload IS NULL
                OR size <> length(payload)
                OR size > ?1
                OR timestamp_ms <= 0
                OR kind NOT IN ({kinds})
                OR state NOT IN ({states})"
        ),
        params![max_event_bytes as i64],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Events pointing at a session row that no longer exists.
fn scan_orphan_events(conn: &Connection) -> BeaconResult<usize> {
    conn.execute(
        "DELETE FROM events WHERE session_id NOT IN (SELECT id FROM sessions)",
        [],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// KV rows: the stored kind/value pair must reassemble into a typed
/// value.
fn scan_kv(conn: &Connection) -> BeaconResult<usize> {
    let mut bad_keys: Vec<String> = Vec::new();
    {
        let mut stmt = conn
            .prepare("SELECT key, kind, value FROM kv")
            .map_err(|e| to_storage_err(e.to_string()))?;
        let mut rows = stmt.query([]).map_err(|e| to_storage_err(e.to_string()))?;
        while let Some(row) = rows.next().map_err(|e| to_storage_err(e.to_string()))? {
            let key: String = row.get(0).map_err(|e| to_storage_err(e.to_string()))?;
            let kind: String = row.get(1).map_err(|e| to_storage_err(e.to_string()))?;
            let value: String = row.get(2).map_err(|e| to_storage_err(e.to_string()))?;
            if AttributeValue::from_parts(&kind, &value).is_none() {
                bad_keys.push(key);
            }
        }
    }

    for key in &bad_keys {
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(bad_keys.len())
}

/// Session rows: the app snapshot must parse and timestamps must be
/// ordered.
fn scan_sessions(conn: &Connection) -> BeaconResult<usize> {
    let mut bad_ids: Vec<String> = Vec::new();
    {
        let mut stmt = conn
            .prepare("SELECT id, started_at_ms, last_event_at_ms, app_info FROM sessions")
            .map_err(|e| to_storage_err(e.to_string()))?;
        let mut rows = stmt.query([]).map_err(|e| to_storage_err(e.to_string()))?;
        while let Some(row) = rows.next().map_err(|e| to_storage_err(e.to_string()))? {
            let id: String = row.get(0).map_err(|e| to_storage_err(e.to_string()))?;
            let started: i64 = row.get(1).map_err(|e| to_storage_err(e.to_string()))?;
            let last: i64 = row.get(2).map_err(|e| to_storage_err(e.to_string()))?;
            let app_json: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;
            let malformed = started <= 0
                || last < started
                || serde_json::from_str::<AppInfo>(&app_json).is_err();
            if malformed {
                bad_ids.push(id);
            }
        }
    }

    for id in &bad_ids {
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(bad_ids.len())
}

fn quoted_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(",")
}
