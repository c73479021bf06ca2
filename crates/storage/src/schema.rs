use rusqlite::Connection;

use crate::error::StorageError;

/// Files and containers share one table; `parent_id` forms the folder tree.
pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(OBJECTS_SQL)?;
    Ok(())
}

const OBJECTS_SQL: &str = "
CREATE TABLE IF NOT EXISTS objects (
    object_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    parent_id TEXT REFERENCES objects (object_id),
    is_container INTEGER NOT NULL DEFAULT 0,
    content BLOB,
    checksum BLOB CHECK (checksum IS NULL OR length(checksum) = 32),
    version TEXT NOT NULL,
    generation INTEGER NOT NULL DEFAULT 1,
    writable INTEGER NOT NULL DEFAULT 1,
    modified_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_objects_parent ON objects (parent_id, name);
";
