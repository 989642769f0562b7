//! Public and internal types for the eegwatch API and pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::utils::config::{PackagePaths, RunDefaults};

/// Tracking state of one file identity (its base name).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileStatus {
    Unseen,
    Succeeded,
    Failed { retry_count: u32 },
}

/// Combined view of both tracking tables for one name.
///
/// A name that succeeded reports [`FileStatus::Succeeded`] even if a late failure row raced in
/// afterwards; the diagnostic fields then come from the success row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub status: FileStatus,
    pub last_event_timestamp: Option<String>,
    pub last_path: Option<PathBuf>,
    /// Only set for failed files.
    pub last_error: Option<String>,
}

impl FileRecord {
    pub fn unseen(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: FileStatus::Unseen,
            last_event_timestamp: None,
            last_path: None,
            last_error: None,
        }
    }
}

/// Row of the `succeeded` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuccessRecord {
    pub name: String,
    pub timestamp: String,
    pub path: PathBuf,
}

/// Row of the `failed` table. At most one per name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureRecord {
    pub name: String,
    pub timestamp: String,
    pub path: PathBuf,
    pub retry_count: u32,
    /// Error text, capped at [`ERROR_TEXT_LIMIT`](crate::utils::config::ERROR_TEXT_LIMIT) characters.
    pub error: String,
}

/// Maximum number of failed attempts before a file is permanently skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryLimit {
    Limited(u32),
    Unlimited,
}

impl RetryLimit {
    /// True once `retry_count` failed attempts use up the limit.
    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        match self {
            RetryLimit::Limited(max) => retry_count >= *max,
            RetryLimit::Unlimited => false,
        }
    }
}

impl Default for RetryLimit {
    fn default() -> Self {
        RetryLimit::Limited(RunDefaults::MAX_RETRIES)
    }
}

impl fmt::Display for RetryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryLimit::Limited(n) => write!(f, "{n}"),
            RetryLimit::Unlimited => f.write_str("unlimited"),
        }
    }
}

impl FromStr for RetryLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unlimited") || s.eq_ignore_ascii_case("none") {
            return Ok(RetryLimit::Unlimited);
        }
        s.parse::<u32>()
            .map(RetryLimit::Limited)
            .map_err(|_| format!("expected a non-negative number or `unlimited`, got `{s}`"))
    }
}

/// Static processing configuration shared by every job of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobSpec {
    /// External processing command.
    pub command: PathBuf,
    /// Task identifier passed as `-Task`.
    pub task: String,
    /// Pipeline config file passed as `-ConfigPath`.
    pub config_path: PathBuf,
    /// Output directory passed as `-OutputPath`.
    pub output_dir: PathBuf,
    /// Working directory passed as `-WorkDir`. Absent in the reduced variant.
    pub work_dir: Option<PathBuf>,
}

/// One unit of work: a detected file plus the run's processing configuration.
#[derive(Clone, Debug)]
pub struct Job {
    pub file_path: PathBuf,
    /// Failed attempts recorded before this one.
    pub retry_count: u32,
    pub spec: Arc<JobSpec>,
}

impl Job {
    pub fn new(file_path: PathBuf, retry_count: u32, spec: Arc<JobSpec>) -> Self {
        Self {
            file_path,
            retry_count,
            spec,
        }
    }

    /// Tracking key: the file's base name.
    pub fn name(&self) -> String {
        tracking_name(&self.file_path)
    }
}

/// Base name used as the tracking key. Falls back to the full path when there is no file name.
pub fn tracking_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Result of one dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Why a file was not enqueued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    AlreadySucceeded,
    RetriesExhausted { retry_count: u32 },
}

/// Eligibility decision for a file identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipReason),
    Process { retry_count: u32 },
}

/// Local mount prefixes paired with the `INPUT_DIR` / `OUTPUT_DIR` / `CONFIG_DIR` / `AUTOCLEAN_DIR`
/// host directories when rewriting paths for the external command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalPrefixes {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: PathBuf,
    pub autoclean: PathBuf,
}

impl Default for LocalPrefixes {
    fn default() -> Self {
        Self {
            input: PathBuf::from(RunDefaults::LOCAL_INPUT_PREFIX),
            output: PathBuf::from(RunDefaults::LOCAL_OUTPUT_PREFIX),
            config: PathBuf::from(RunDefaults::LOCAL_CONFIG_PREFIX),
            autoclean: PathBuf::from(RunDefaults::LOCAL_AUTOCLEAN_PREFIX),
        }
    }
}

/// Full run options (CLI merged over `.eegwatch.toml`).
#[derive(Clone, Debug)]
pub struct Opts {
    /// Monitored directory.
    pub dir: PathBuf,
    /// Extensions to watch, as given (normalized by the extension filter).
    pub extensions: Vec<String>,
    /// Tracking database path. When None, uses `dir.join(".eegwatch")`.
    pub db_path: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub task: Option<String>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub max_workers: usize,
    pub max_retries: RetryLimit,
    /// Clear all tracking records before scanning.
    pub reset_tracking: bool,
    /// Scan and watch subdirectories too.
    pub recursive: bool,
    /// Import `processed_files.csv` / `error_files.csv` from the monitored directory.
    pub import_legacy: bool,
    /// Startup scan only: drain the queue and exit without watching.
    pub once: bool,
    pub verbose: bool,
    pub namespace_prefixes: LocalPrefixes,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            extensions: Vec::new(),
            db_path: None,
            script: None,
            task: None,
            config: None,
            output: None,
            work_dir: None,
            max_workers: RunDefaults::MAX_WORKERS,
            max_retries: RetryLimit::default(),
            reset_tracking: false,
            recursive: false,
            import_legacy: false,
            once: false,
            verbose: false,
            namespace_prefixes: LocalPrefixes::default(),
        }
    }
}

impl Opts {
    /// Tracking database path, defaulting to the package db filename in the monitored directory.
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.dir.join(PackagePaths::get().db_filename()))
    }

    /// Build the static job configuration. Fails when a required option is missing.
    pub fn job_spec(&self) -> crate::Result<JobSpec> {
        fn required<T: Clone>(value: &Option<T>, flag: &str) -> crate::Result<T> {
            value
                .clone()
                .ok_or_else(|| anyhow::anyhow!("missing required option {flag}"))
        }
        Ok(JobSpec {
            command: required(&self.script, "--script")?,
            task: required(&self.task, "--task")?,
            config_path: required(&self.config, "--config")?,
            output_dir: required(&self.output, "--output")?,
            work_dir: self.work_dir.clone(),
        })
    }
}
