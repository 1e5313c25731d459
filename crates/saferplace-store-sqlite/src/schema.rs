//! SQL schema for the SaferPlace SQLite store.
//!
//! Executed on every open. Every statement is create-if-absent, so running it
//! against an existing database changes nothing.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS incidents (
    id          TEXT PRIMARY KEY,
    timestamp   INTEGER NOT NULL,  -- seconds since epoch
    description TEXT,
    lat         REAL NOT NULL,
    lon         REAL NOT NULL,
    resolution  TEXT NOT NULL,     -- canonical label, e.g. 'RESOLUTION_ACCEPTED'
    image       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS lat ON incidents (lat);
CREATE INDEX IF NOT EXISTS lon ON incidents (lon);

-- Append-only. incident_id is checked by the store, not by a foreign key.
CREATE TABLE IF NOT EXISTS comments (
    id          TEXT PRIMARY KEY,
    incident_id TEXT NOT NULL,
    timestamp   INTEGER NOT NULL,
    author      TEXT NOT NULL,
    comment     TEXT NOT NULL,
    resolution  TEXT NOT NULL      -- resolution applied by this review
);

CREATE INDEX IF NOT EXISTS incident_ids ON comments (incident_id);

CREATE TABLE IF NOT EXISTS sessions (
    id     TEXT PRIMARY KEY,       -- the bearer token
    expiry INTEGER NOT NULL        -- seconds since epoch
);

PRAGMA user_version = 1;
";

/// Create any missing tables and indexes.
pub fn init(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.execute_batch(SCHEMA)
}
