//! Tracking store: durable per-file outcome records behind a single serialized connection.

use anyhow::{Context, Result};
use log::{error, info, warn};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::engine::tools::{now_timestamp, path_to_db_string, truncate_chars};
use crate::utils::config::ERROR_TEXT_LIMIT;
use crate::{FailureRecord, FileRecord, FileStatus, SuccessRecord};

use super::{
    DELETE_FAILURE_SQL, UPSERT_FAILURE_SQL, UPSERT_SUCCESS_SQL, open_db, open_db_in_memory,
};

/// Owns every tracking record. All reads and writes go through one mutex, so concurrent outcome
/// updates are applied one at a time and none is lost.
///
/// Read failures degrade to "not tracked"; write failures are logged and the update is dropped.
pub struct TrackingStore {
    pub(super) conn: Mutex<Connection>,
    location: Option<PathBuf>,
}

impl TrackingStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = open_db(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_db_in_memory()?),
            location: None,
        })
    }

    /// Open the store at `path`; if that fails, log and fall back to an empty in-memory store
    /// (previously processed files may be processed again).
    pub fn open_or_in_memory(path: &Path) -> Result<Self> {
        match Self::open(path) {
            Ok(store) => Ok(store),
            Err(e) => {
                error!(
                    "Cannot use tracking database {}: {:#}. Tracking in memory only for this run.",
                    path.display(),
                    e
                );
                Self::open_in_memory()
            }
        }
    }

    /// Database file backing this store; None when in memory.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_succeeded(&self, name: &str) -> bool {
        self.success_record(name).is_some()
    }

    /// Failed attempts recorded for `name` (0 if never failed).
    pub fn retry_count_of(&self, name: &str) -> u32 {
        self.failure_record(name).map_or(0, |r| r.retry_count)
    }

    pub fn success_record(&self, name: &str) -> Option<SuccessRecord> {
        let conn = self.lock();
        conn.query_row(
            "SELECT name, timestamp, path FROM succeeded WHERE name = ?1",
            [name],
            |row| {
                Ok(SuccessRecord {
                    name: row.get(0)?,
                    timestamp: row.get(1)?,
                    path: PathBuf::from(row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .unwrap_or_else(|e| {
            error!("Error reading success record for {name}: {e}");
            None
        })
    }

    pub fn failure_record(&self, name: &str) -> Option<FailureRecord> {
        let conn = self.lock();
        conn.query_row(
            "SELECT name, timestamp, path, retries, error FROM failed WHERE name = ?1",
            [name],
            |row| {
                let retries: i64 = row.get(3)?;
                Ok(FailureRecord {
                    name: row.get(0)?,
                    timestamp: row.get(1)?,
                    path: PathBuf::from(row.get::<_, String>(2)?),
                    retry_count: u32::try_from(retries.max(0)).unwrap_or(u32::MAX),
                    error: row.get(4)?,
                })
            },
        )
        .optional()
        .unwrap_or_else(|e| {
            error!("Error reading failure record for {name}: {e}");
            None
        })
    }

    /// Combined status for `name`. Success wins over a failure row.
    pub fn file_record(&self, name: &str) -> FileRecord {
        if let Some(s) = self.success_record(name) {
            return FileRecord {
                name: s.name,
                status: FileStatus::Succeeded,
                last_event_timestamp: Some(s.timestamp),
                last_path: Some(s.path),
                last_error: None,
            };
        }
        match self.failure_record(name) {
            Some(f) => FileRecord {
                name: f.name,
                status: FileStatus::Failed {
                    retry_count: f.retry_count,
                },
                last_event_timestamp: Some(f.timestamp),
                last_path: Some(f.path),
                last_error: Some(f.error),
            },
            None => FileRecord::unseen(name),
        }
    }

    /// Mark `name` succeeded and clear its failure row, in one transaction.
    /// Recording the same success again only refreshes timestamp and path.
    pub fn record_success(&self, name: &str, path: &Path) {
        match self.try_record_success(name, path) {
            Ok(()) => info!("Recorded successful processing of {name}"),
            Err(e) => error!("Error recording success for {name}: {e:#}"),
        }
    }

    fn try_record_success(&self, name: &str, path: &Path) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction().context("begin transaction")?;
        tx.execute(
            UPSERT_SUCCESS_SQL,
            params![name, now_timestamp(), path_to_db_string(path)],
        )
        .context("insert success")?;
        tx.execute(DELETE_FAILURE_SQL, [name])
            .context("clear failure")?;
        tx.commit().context("commit transaction")?;
        Ok(())
    }

    /// Count one more failed attempt for `name` (starting at 1) and keep the latest error text,
    /// capped at [`ERROR_TEXT_LIMIT`] characters. Returns the new count, or None if the write failed.
    pub fn record_failure(&self, name: &str, path: &Path, error_text: &str) -> Option<u32> {
        let error_text = truncate_chars(error_text, ERROR_TEXT_LIMIT);
        let result = {
            let conn = self.lock();
            conn.query_row(
                UPSERT_FAILURE_SQL,
                params![name, now_timestamp(), path_to_db_string(path), error_text],
                |row| row.get::<_, i64>(0),
            )
        };
        match result {
            Ok(retries) => {
                let retries = u32::try_from(retries.max(0)).unwrap_or(u32::MAX);
                info!("Recorded error for {name} (retry {retries})");
                Some(retries)
            }
            Err(e) => {
                error!("Error recording failure for {name}: {e}");
                None
            }
        }
    }

    /// Clear every record.
    pub fn reset(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch("DELETE FROM succeeded; DELETE FROM failed;")
            .context("clear tracking records")?;
        warn!("Tracking records cleared; every file is eligible again");
        Ok(())
    }

    /// (succeeded, failed) row counts. Zero on read errors.
    pub fn counts(&self) -> (usize, usize) {
        let conn = self.lock();
        let count = |table: &str| -> usize {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| usize::try_from(n).unwrap_or(0))
            .unwrap_or_else(|e| {
                error!("Error counting {table} records: {e}");
                0
            })
        };
        (count("succeeded"), count("failed"))
    }
}
