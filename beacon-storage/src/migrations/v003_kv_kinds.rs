//! V003: typed key-value store. Adds the kind column and backfills it
//! from the JSON shape of existing values.

use rusqlite::Connection;

use super::column_exists;

pub fn apply(conn: &Connection) -> rusqlite::Result<()> {
    if !column_exists(conn, "kv", "kind")? {
        conn.execute_batch("ALTER TABLE kv ADD COLUMN kind TEXT NOT NULL DEFAULT 'text';")?;
    }

    // Rows written before this version carry plain JSON values; derive
    // each kind from the JSON type. Invalid JSON keeps the 'text'
    // default and is dropped by the startup row scan.
    conn.execute_batch(
        "
        UPDATE kv SET kind = CASE json_type(value)
            WHEN 'integer' THEN 'counter'
            WHEN 'true' THEN 'bool'
            WHEN 'false' THEN 'bool'
            WHEN 'array' THEN 'string_set'
            ELSE 'text'
        END
        WHERE json_valid(value);
        ",
    )
}
