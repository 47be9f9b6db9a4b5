//! Database schema. All statements are idempotent
//! (`CREATE TABLE IF NOT EXISTS`), so migrations run on every open.

use rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS students (
    identity TEXT PRIMARY KEY,
    name     TEXT NOT NULL,
    grade    TEXT NOT NULL,
    section  TEXT NOT NULL,
    photo    BLOB
);

CREATE TABLE IF NOT EXISTS attendance (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    identity  TEXT NOT NULL,
    grade     TEXT NOT NULL,
    section   TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_attendance_identity ON attendance(identity, timestamp);
CREATE INDEX IF NOT EXISTS idx_attendance_cohort ON attendance(grade, section, timestamp);

CREATE TABLE IF NOT EXISTS logs (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    actor   TEXT NOT NULL,
    action  TEXT NOT NULL,
    date    TEXT NOT NULL,
    time    TEXT NOT NULL,
    grade   TEXT,
    section TEXT
);
";

/// Create all tables if missing. The per-day uniqueness of attendance rows
/// is enforced by the ledger, not by a table constraint.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
