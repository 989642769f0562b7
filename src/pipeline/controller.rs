//! Watch/scan controller: turns detected paths into queued jobs.
//!
//! Both detection sources (startup scan and live feed) go through [`WatchController::consider`],
//! so a file present before startup and one created afterwards get the same eligibility check.

use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

use crate::engine::db_ops::TrackingStore;
use crate::engine::tools::{
    dotted_extension, is_os_hidden_file, is_tracking_db_file, normalize_extension,
};
use crate::{Decision, Job, JobSpec, SkipReason, tracking_name};

use super::eligibility::EligibilityPolicy;
use super::queue::JobSender;

/// Receives file-creation notifications from whatever watches the filesystem.
pub trait FileEventSink: Send + Sync {
    fn on_file_created(&self, path: &Path);
}

/// Case-insensitive extension allow-list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        let mut extensions: Vec<String> = extensions
            .iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| e.len() > 1)
            .collect();
        extensions.sort();
        extensions.dedup();
        Self { extensions }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn matches(&self, path: &Path) -> bool {
        dotted_extension(path).is_some_and(|ext| self.extensions.contains(&ext))
    }
}

/// Where a path came from (for logging).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Detection {
    StartupScan,
    LiveFeed,
}

pub struct WatchController {
    policy: EligibilityPolicy,
    store: Arc<TrackingStore>,
    spec: Arc<JobSpec>,
    filter: ExtensionFilter,
    db_path: Option<PathBuf>,
    queue: Mutex<Option<JobSender>>,
}

impl WatchController {
    pub fn new(
        policy: EligibilityPolicy,
        store: Arc<TrackingStore>,
        spec: Arc<JobSpec>,
        filter: ExtensionFilter,
        queue: JobSender,
    ) -> Self {
        let db_path = store.location().map(Path::to_path_buf);
        Self {
            policy,
            store,
            spec,
            filter,
            db_path,
            queue: Mutex::new(Some(queue)),
        }
    }

    pub fn filter(&self) -> &ExtensionFilter {
        &self.filter
    }

    /// True if `path` names a data file we watch for (not a directory, not our own DB files).
    pub fn accepts(&self, path: &Path) -> bool {
        if !self.filter.matches(path) || is_os_hidden_file(path) {
            return false;
        }
        if let Some(ref db) = self.db_path
            && is_tracking_db_file(path, db)
        {
            return false;
        }
        !path.is_dir()
    }

    /// Evaluate eligibility for `path` and enqueue a job if eligible. Returns true if enqueued.
    pub fn consider(&self, path: &Path, source: Detection) -> bool {
        if !self.accepts(path) {
            return false;
        }
        match source {
            Detection::StartupScan => debug!("Found existing data file: {}", path.display()),
            Detection::LiveFeed => info!("New data file detected: {}", path.display()),
        }
        let name = tracking_name(path);
        let retry_count = match self.policy.evaluate(&self.store, &name) {
            Decision::Process { retry_count } => retry_count,
            Decision::Skip(SkipReason::AlreadySucceeded) => {
                info!("Skipping already processed file: {}", path.display());
                return false;
            }
            Decision::Skip(SkipReason::RetriesExhausted { .. }) => return false,
        };
        let guard = self.queue.lock().unwrap_or_else(|p| p.into_inner());
        let Some(queue) = guard.as_ref() else {
            debug!("Queue closed; ignoring {}", path.display());
            return false;
        };
        let job = Job::new(path.to_path_buf(), retry_count, Arc::clone(&self.spec));
        if queue.submit(job) {
            info!("Queued {} (pending: {})", path.display(), queue.len());
            true
        } else {
            warn!("No workers left; dropping {}", path.display());
            false
        }
    }

    /// Enqueue every eligible existing file under `dir`. Only direct children unless `recursive`.
    /// Returns the number of jobs enqueued.
    pub fn startup_scan(&self, dir: &Path, recursive: bool) -> usize {
        let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }
        let mut queued = 0_usize;
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_dir()
                        && self.consider(entry.path(), Detection::StartupScan)
                    {
                        queued += 1;
                    }
                }
                Err(err) => warn!("Permission denied or error accessing path: {}", err),
            }
        }
        info!("Startup scan of {} queued {} files", dir.display(), queued);
        queued
    }

    /// Drop the producer handle. Later detections are ignored; workers exit once the queue drains.
    pub fn close(&self) {
        let mut guard = self.queue.lock().unwrap_or_else(|p| p.into_inner());
        guard.take();
    }
}

impl FileEventSink for WatchController {
    fn on_file_created(&self, path: &Path) {
        self.consider(path, Detection::LiveFeed);
    }
}
