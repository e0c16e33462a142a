//! V001: initial schema. Event queue, session rows, key-value store,
//! and the meta table holding SDK bookkeeping such as the schema marker.

pub const MIGRATION_SQL: &str = r#"
-- Durable event queue. Rows are claimed by marking state, deleted on
-- acknowledged delivery, and trimmed oldest-first under the size cap.
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    timestamp_ms INTEGER NOT NULL,
    session_id TEXT NOT NULL,
    payload BLOB NOT NULL,
    size INTEGER NOT NULL,
    state TEXT NOT NULL DEFAULT 'pending'
) STRICT;

CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp_ms);

-- Sessions: one row per tracked session, app_info is a JSON snapshot
-- taken at session start.
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    started_at_ms INTEGER NOT NULL,
    last_event_at_ms INTEGER NOT NULL,
    ended_at_ms INTEGER,
    app_info TEXT NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at_ms);

-- Typed key-value store: profile attributes and SDK metadata.
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
) STRICT;

-- SDK-internal bookkeeping, never exposed through the store API.
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
) STRICT;
"#;

pub fn apply(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(MIGRATION_SQL)
}
