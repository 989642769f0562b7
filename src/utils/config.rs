//! Application configuration constants.
//! Defaults and limits in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    db_filename: String,
    settings_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                db_filename: format!(".{pkg}"),
                settings_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Tracking database file name, placed in the monitored directory by default.
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    /// Optional settings file looked up in the monitored directory.
    pub fn settings_filename(&self) -> &str {
        &self.settings_filename
    }
}

/// CSV trackers written by the previous watchdog, imported with `--import-legacy`.
pub struct LegacyTrackers;

impl LegacyTrackers {
    pub const SUCCESS_FILENAME: &'static str = "processed_files.csv";
    pub const ERROR_FILENAME: &'static str = "error_files.csv";
}

// ---- Run defaults ----

pub struct RunDefaults;

impl RunDefaults {
    pub const MAX_WORKERS: usize = 3;
    pub const MAX_RETRIES: u32 = 3;
    pub const LOCAL_INPUT_PREFIX: &'static str = "/data/input";
    pub const LOCAL_OUTPUT_PREFIX: &'static str = "/data/output";
    pub const LOCAL_CONFIG_PREFIX: &'static str = "/config";
    pub const LOCAL_AUTOCLEAN_PREFIX: &'static str = "/autoclean";
}

// ---- Queue / shutdown ----

pub struct QueueConsts;

impl QueueConsts {
    /// Bounded wait for a worker blocked on an empty queue.
    pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
    /// How often the main loop checks for a stop request.
    pub const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(200);
}

// ---- Tracking ----

/// Max characters of error text kept in a failure record.
pub const ERROR_TEXT_LIMIT: usize = 200;

/// Timestamp format for tracking records (local time).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite busy timeout for the tracking database.
pub const DB_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
