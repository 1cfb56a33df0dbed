//! v001 -- Initial schema creation.
//!
//! A single `records` table holding one serialized value per logical key.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    key        TEXT PRIMARY KEY NOT NULL,   -- logical record key, e.g. whisper.contacts
    value      TEXT NOT NULL,               -- serialized JSON
    updated_at TEXT NOT NULL                -- RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
