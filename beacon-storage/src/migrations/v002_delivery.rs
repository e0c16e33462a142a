//! V002: delivery bookkeeping. Adds the per-event attempt counter and
//! the (state, id) index the claim scan runs on.

use rusqlite::Connection;

use super::column_exists;

pub fn apply(conn: &Connection) -> rusqlite::Result<()> {
    // ALTER TABLE has no IF NOT EXISTS, so probe first to stay
    // re-runnable against a partially applied schema.
    if !column_exists(conn, "events", "attempt_count")? {
        conn.execute_batch(
            "ALTER TABLE events ADD COLUMN attempt_count INTEGER NOT NULL DEFAULT 0;",
        )?;
    }
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_events_state_id ON events(state, id);",
    )
}
