//! Event queue operations: append with trim, claim, acknowledge,
//! release, and the startup in-flight reset.

use beacon_core::errors::{BeaconError, BeaconResult, QueueError, StorageError};
use beacon_core::events::{Batch, EventKind, EventRecord, EventState, NewEvent};
use rusqlite::{params, Connection};

use crate::to_storage_err;

use super::id_list;

/// Insert one event and trim oldest pending rows over the cap, both in
/// one transaction. Returns the new row id.
pub fn append_event(
    conn: &Connection,
    event: &NewEvent,
    max_total_bytes: u64,
) -> BeaconResult<i64> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("append begin: {e}")))?;

    match append_inner(&tx, event, max_total_bytes) {
        Ok(id) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("append commit: {e}")))?;
            Ok(id)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

fn append_inner(conn: &Connection, event: &NewEvent, max_total_bytes: u64) -> BeaconResult<i64> {
    conn.execute(
        "INSERT INTO events (kind, timestamp_ms, session_id, payload, size, state)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending')",
        params![
            event.kind.as_str(),
            event.timestamp_ms,
            event.session_id,
            event.payload,
            event.payload.len() as i64,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let id = conn.last_insert_rowid();
    trim_pending(conn, max_total_bytes)?;
    Ok(id)
}

/// Claim the oldest pending events, oldest-first, and mark them
/// in-flight in the same transaction. Refuses to stack a second claim
/// on top of an outstanding one.
pub fn claim_batch(conn: &Connection, max_events: usize, max_bytes: u64) -> BeaconResult<Batch> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("claim begin: {e}")))?;

    match claim_inner(&tx, max_events, max_bytes) {
        Ok(batch) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("claim commit: {e}")))?;
            Ok(batch)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

fn claim_inner(conn: &Connection, max_events: usize, max_bytes: u64) -> BeaconResult<Batch> {
    let in_flight: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM events WHERE state = 'in_flight'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if in_flight > 0 {
        return Err(QueueError::BatchAlreadyInFlight {
            in_flight: in_flight as usize,
        }
        .into());
    }

    let mut stmt = conn
        .prepare(
            "SELECT id, kind, timestamp_ms, session_id, payload, size, attempt_count
             FROM events WHERE state = 'pending' ORDER BY id ASC LIMIT ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query(params![max_events as i64])
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut events: Vec<EventRecord> = Vec::new();
    let mut total: u64 = 0;
    while let Some(row) = rows.next().map_err(|e| to_storage_err(e.to_string()))? {
        let event = parse_event_row(row)?;
        // The first event always ships, even when it alone exceeds the
        // byte cap; otherwise an oversized head would wedge the queue.
        if !events.is_empty() && total + event.size > max_bytes {
            break;
        }
        total += event.size;
        events.push(event);
    }
    drop(rows);
    drop(stmt);

    if events.is_empty() {
        return Ok(Batch::new(Vec::new()));
    }

    let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
    conn.execute(
        &format!(
            "UPDATE events SET state = 'in_flight' WHERE id IN ({})",
            id_list(&ids)
        ),
        [],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    for event in &mut events {
        event.state = EventState::InFlight;
    }
    Ok(Batch::new(events))
}

fn parse_event_row(row: &rusqlite::Row<'_>) -> BeaconResult<EventRecord> {
    let id: i64 = row.get(0).map_err(|e| to_storage_err(e.to_string()))?;
    let kind_raw: String = row.get(1).map_err(|e| to_storage_err(e.to_string()))?;
    let timestamp_ms: i64 = row.get(2).map_err(|e| to_storage_err(e.to_string()))?;
    let session_id: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;
    let payload: Vec<u8> = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;
    let size: i64 = row.get(5).map_err(|e| to_storage_err(e.to_string()))?;
    let attempt_count: i64 = row.get(6).map_err(|e| to_storage_err(e.to_string()))?;

    let kind = EventKind::parse(&kind_raw).ok_or_else(|| {
        BeaconError::from(StorageError::CorruptionDetected {
            details: format!("unknown event kind '{kind_raw}' in row {id}"),
        })
    })?;

    Ok(EventRecord {
        id,
        kind,
        timestamp_ms,
        session_id,
        payload,
        size: size as u64,
        attempt_count: attempt_count as u32,
        state: EventState::Pending,
    })
}

/// Delete delivered rows. Only in-flight rows with matching ids go.
pub fn acknowledge(conn: &Connection, ids: &[i64]) -> BeaconResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    conn.execute(
        &format!(
            "DELETE FROM events WHERE state = 'in_flight' AND id IN ({})",
            id_list(ids)
        ),
        [],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Return claimed rows to pending and count the failed attempt.
pub fn release(conn: &Connection, ids: &[i64]) -> BeaconResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    conn.execute(
        &format!(
            "UPDATE events SET state = 'pending', attempt_count = attempt_count + 1
             WHERE state = 'in_flight' AND id IN ({})",
            id_list(ids)
        ),
        [],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Restore rows left in-flight by a previous process. No attempt
/// increment: the send never completed, so it does not count.
pub fn reset_in_flight(conn: &Connection) -> BeaconResult<usize> {
    conn.execute(
        "UPDATE events SET state = 'pending' WHERE state = 'in_flight'",
        [],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Trim oldest pending rows in a standalone transaction.
pub fn trim_to_cap(conn: &Connection, max_total_bytes: u64) -> BeaconResult<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("trim begin: {e}")))?;

    match trim_pending(&tx, max_total_bytes) {
        Ok(dropped) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("trim commit: {e}")))?;
            Ok(dropped)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Drop oldest pending rows until retained payload fits the cap.
/// In-flight rows are never trimmed; their bytes shrink the budget
/// available to pending rows instead.
fn trim_pending(conn: &Connection, max_total_bytes: u64) -> BeaconResult<usize> {
    let in_flight_bytes: i64 = conn
        .query_row(
            "SELECT COALESCE(SUM(size), 0) FROM events WHERE state = 'in_flight'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let budget = (max_total_bytes as i64 - in_flight_bytes).max(0);

    let dropped = conn
        .execute(
            "DELETE FROM events WHERE id IN (
                SELECT id FROM (
                    SELECT id, SUM(size) OVER (ORDER BY id DESC) AS running
                    FROM events WHERE state = 'pending'
                ) WHERE running > ?1
            )",
            params![budget],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    if dropped > 0 {
        tracing::warn!(dropped, budget, "storage: trimmed oldest pending events");
    }
    Ok(dropped)
}

pub fn pending_count(conn: &Connection) -> BeaconResult<usize> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM events WHERE state = 'pending'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as usize)
}

/// Payload bytes across all retained rows, pending and in-flight.
pub fn total_payload_bytes(conn: &Connection) -> BeaconResult<u64> {
    let total: i64 = conn
        .query_row("SELECT COALESCE(SUM(size), 0) FROM events", [], |row| {
            row.get(0)
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(total as u64)
}
