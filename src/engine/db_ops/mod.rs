//! Tracking database operations: schema, open, per-file outcome records, legacy CSV import.

mod connection;
mod legacy;
mod tracker;

pub use connection::{open_db, open_db_in_memory};
pub use legacy::{LegacyImport, import_legacy_trackers};
pub use tracker::TrackingStore;

/// WAL tuning pragmas. Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 1000;
        "#;

/// One table per record kind, both keyed by file base name.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS succeeded (
    name TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    path TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS failed (
    name TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    path TEXT NOT NULL,
    retries INTEGER NOT NULL,
    error TEXT NOT NULL
);
"#;

pub(crate) const UPSERT_SUCCESS_SQL: &str =
    "INSERT OR REPLACE INTO succeeded (name, timestamp, path) VALUES (?1, ?2, ?3)";

pub(crate) const DELETE_FAILURE_SQL: &str = "DELETE FROM failed WHERE name = ?1";

/// Atomic increment: a new row starts at 1, an existing row gets count + 1.
pub(crate) const UPSERT_FAILURE_SQL: &str = r#"
INSERT INTO failed (name, timestamp, path, retries, error) VALUES (?1, ?2, ?3, 1, ?4)
ON CONFLICT(name) DO UPDATE SET
    timestamp = excluded.timestamp,
    path = excluded.path,
    retries = failed.retries + 1,
    error = excluded.error
RETURNING retries
"#;
