//! Session row operations.

use beacon_core::errors::BeaconResult;
use beacon_core::models::{AppInfo, SessionRecord};
use rusqlite::{params, Connection, OptionalExtension};

use crate::to_storage_err;

pub fn open_session(conn: &Connection, session: &SessionRecord) -> BeaconResult<()> {
    let app_json = serde_json::to_string(&session.app)?;
    conn.execute(
        "INSERT INTO sessions (id, started_at_ms, last_event_at_ms, ended_at_ms, app_info)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            session.id,
            session.started_at_ms,
            session.last_event_at_ms,
            session.ended_at_ms,
            app_json,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn touch_session(conn: &Connection, id: &str, last_event_at_ms: i64) -> BeaconResult<()> {
    conn.execute(
        "UPDATE sessions SET last_event_at_ms = ?2 WHERE id = ?1",
        params![id, last_event_at_ms],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Close a session. A second close of the same session is a no-op.
pub fn close_session(conn: &Connection, id: &str, ended_at_ms: i64) -> BeaconResult<()> {
    conn.execute(
        "UPDATE sessions SET ended_at_ms = ?2 WHERE id = ?1 AND ended_at_ms IS NULL",
        params![id, ended_at_ms],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Most recently started session, open or closed.
pub fn latest_session(conn: &Connection) -> BeaconResult<Option<SessionRecord>> {
    let row: Option<(String, i64, i64, Option<i64>, String)> = conn
        .query_row(
            "SELECT id, started_at_ms, last_event_at_ms, ended_at_ms, app_info
             FROM sessions ORDER BY started_at_ms DESC LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            },
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    match row {
        None => Ok(None),
        Some((id, started_at_ms, last_event_at_ms, ended_at_ms, app_json)) => {
            let app: AppInfo = serde_json::from_str(&app_json)?;
            Ok(Some(SessionRecord {
                id,
                started_at_ms,
                last_event_at_ms,
                ended_at_ms,
                app,
            }))
        }
    }
}

/// Drop old closed sessions, keeping the most recent `keep` rows.
/// Sessions still referenced by queued events are never pruned, so
/// the orphan scan cannot misread their events as malformed.
pub fn prune_sessions(conn: &Connection, keep: usize) -> BeaconResult<usize> {
    let dropped = conn
        .execute(
            "DELETE FROM sessions WHERE ended_at_ms IS NOT NULL
             AND id NOT IN (
                 SELECT id FROM sessions ORDER BY started_at_ms DESC LIMIT ?1
             )
             AND id NOT IN (SELECT DISTINCT session_id FROM events)",
            params![keep as i64],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(dropped)
}
