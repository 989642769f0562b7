//! Import the CSV trackers (`processed_files.csv`, `error_files.csv`) kept by the previous watchdog.

use anyhow::{Context, Result};
use log::{info, warn};
use rusqlite::params;
use serde::Deserialize;
use std::path::Path;

use crate::engine::tools::truncate_chars;
use crate::utils::config::{ERROR_TEXT_LIMIT, LegacyTrackers};

use super::TrackingStore;

#[derive(Debug, Deserialize)]
struct LegacySuccessRow {
    filename: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    filepath: String,
}

#[derive(Debug, Deserialize)]
struct LegacyErrorRow {
    filename: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    filepath: String,
    /// Kept as text: unparsable counts import as 0.
    #[serde(default)]
    retries: String,
    #[serde(default)]
    error: String,
}

/// Rows imported from the legacy trackers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LegacyImport {
    pub succeeded: usize,
    pub failed: usize,
    /// Malformed rows, or rows already present in the database.
    pub skipped: usize,
}

/// Import legacy CSV trackers found in `dir`. Existing records win, and a failure row is never
/// imported for a name that already succeeded, so running this twice changes nothing.
pub fn import_legacy_trackers(store: &TrackingStore, dir: &Path) -> Result<LegacyImport> {
    let mut summary = LegacyImport::default();
    let success_path = dir.join(LegacyTrackers::SUCCESS_FILENAME);
    let error_path = dir.join(LegacyTrackers::ERROR_FILENAME);

    let mut conn = store.lock();
    let tx = conn.transaction().context("begin transaction")?;

    if success_path.is_file() {
        let mut reader = csv::Reader::from_path(&success_path)
            .with_context(|| format!("open {}", success_path.display()))?;
        for row in reader.deserialize::<LegacySuccessRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!("{}: skipping malformed row: {}", success_path.display(), e);
                    summary.skipped += 1;
                    continue;
                }
            };
            let inserted = tx
                .execute(
                    "INSERT OR IGNORE INTO succeeded (name, timestamp, path) VALUES (?1, ?2, ?3)",
                    params![row.filename, row.timestamp, row.filepath],
                )
                .context("import success row")?;
            if inserted > 0 {
                summary.succeeded += 1;
            } else {
                summary.skipped += 1;
            }
        }
    }

    if error_path.is_file() {
        let mut reader = csv::Reader::from_path(&error_path)
            .with_context(|| format!("open {}", error_path.display()))?;
        for row in reader.deserialize::<LegacyErrorRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!("{}: skipping malformed row: {}", error_path.display(), e);
                    summary.skipped += 1;
                    continue;
                }
            };
            let retries: i64 = row.retries.trim().parse().unwrap_or(0);
            let inserted = tx
                .execute(
                    r#"INSERT OR IGNORE INTO failed (name, timestamp, path, retries, error)
                       SELECT ?1, ?2, ?3, ?4, ?5
                       WHERE NOT EXISTS (SELECT 1 FROM succeeded WHERE name = ?1)"#,
                    params![
                        row.filename,
                        row.timestamp,
                        row.filepath,
                        retries.max(0),
                        truncate_chars(&row.error, ERROR_TEXT_LIMIT)
                    ],
                )
                .context("import failure row")?;
            if inserted > 0 {
                summary.failed += 1;
            } else {
                summary.skipped += 1;
            }
        }
    }

    tx.commit().context("commit legacy import")?;
    info!(
        "Imported legacy trackers: {} succeeded, {} failed, {} skipped",
        summary.succeeded, summary.failed, summary.skipped
    );
    Ok(summary)
}
