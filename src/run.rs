//! Watchdog run: open tracking, start workers, scan, watch until stopped, drain.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::Opts;
use crate::engine::db_ops::{TrackingStore, import_legacy_trackers};
use crate::engine::namespace::{HostDirs, NamespaceMapping};
use crate::pipeline::{
    CommandDispatcher, Dispatch, EligibilityPolicy, ExtensionFilter, LiveFeed, PoolStats,
    WatchController, WorkerPool, start_live_feed, work_queue,
};
use crate::utils::config::QueueConsts;

/// What a run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Jobs queued by the startup scan.
    pub scanned: usize,
    pub stats: PoolStats,
}

/// Create output and work directories when missing.
fn prepare_directories(opts: &Opts) -> Result<()> {
    for dir in [opts.output.as_deref(), opts.work_dir.as_deref()]
        .into_iter()
        .flatten()
    {
        if !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create directory {}", dir.display()))?;
            info!("Created directory: {}", dir.display());
        }
    }
    Ok(())
}

/// Open the tracking store, then apply reset or legacy import as requested.
/// A reset wins over the legacy import, so the imported records cannot undo it.
pub fn open_tracking(opts: &Opts) -> Result<TrackingStore> {
    let db_path = opts.db_path();
    let store = TrackingStore::open_or_in_memory(&db_path)?;
    if opts.reset_tracking {
        info!("Resetting tracking records as requested");
        store.reset()?;
        if opts.import_legacy {
            warn!("Skipping legacy tracker import because tracking was reset");
        }
    } else if opts.import_legacy
        && let Err(e) = import_legacy_trackers(&store, &opts.dir)
    {
        log::error!("Legacy tracker import failed: {e:#}");
    }
    let (succeeded, failed) = store.counts();
    info!(
        "Tracking database: {} ({} succeeded, {} failed)",
        db_path.display(),
        succeeded,
        failed
    );
    Ok(store)
}

/// Run with the default external-command dispatcher and Ctrl+C as the stop signal.
/// With `opts.once` nothing waits for a stop, so Ctrl+C keeps its default behavior.
pub fn run_watchdog(opts: &Opts) -> Result<RunSummary> {
    let stop_requested = Arc::new(AtomicBool::new(false));
    if !opts.once {
        let stop_requested_handler = Arc::clone(&stop_requested);
        ctrlc::set_handler(move || {
            stop_requested_handler.store(true, Ordering::Relaxed);
        })
        .context("set Ctrl+C handler")?;
    }

    let spec = opts.job_spec()?;
    let host = HostDirs::from_env(&opts.dir);
    host.log_summary();
    let mapping = NamespaceMapping::new(host, &opts.namespace_prefixes);
    let dispatcher = Arc::new(CommandDispatcher::new(&spec.command, mapping)?);
    run_watchdog_with(opts, dispatcher, &stop_requested)
}

/// Run until `stop` is set (or, with `opts.once`, until the startup scan is processed).
/// In-flight and queued jobs always finish before this returns.
pub fn run_watchdog_with(
    opts: &Opts,
    dispatcher: Arc<dyn Dispatch>,
    stop: &AtomicBool,
) -> Result<RunSummary> {
    let spec = Arc::new(opts.job_spec()?);
    prepare_directories(opts)?;
    let store = Arc::new(open_tracking(opts)?);

    let (sender, receiver) = work_queue();
    let pool = WorkerPool::spawn(
        opts.max_workers,
        receiver,
        dispatcher,
        Arc::clone(&store),
        QueueConsts::POLL_INTERVAL,
    )?;
    let controller = Arc::new(WatchController::new(
        EligibilityPolicy::new(opts.max_retries),
        Arc::clone(&store),
        spec,
        ExtensionFilter::new(&opts.extensions),
        sender,
    ));

    // Subscribe before scanning so files created during the scan are not missed.
    let feed: Option<LiveFeed> = if opts.once {
        None
    } else {
        match start_live_feed(&opts.dir, opts.recursive, controller.clone()) {
            Ok(feed) => Some(feed),
            Err(e) => {
                controller.close();
                pool.join();
                return Err(e);
            }
        }
    };
    let scanned = controller.startup_scan(&opts.dir, opts.recursive);

    if feed.is_some() {
        info!("Monitoring {} (Ctrl+C to stop)", opts.dir.display());
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(QueueConsts::STOP_CHECK_INTERVAL);
        }
        info!("Stopping monitoring of {}", opts.dir.display());
    }

    drop(feed);
    controller.close();
    info!("Waiting for remaining files to be processed...");
    let stats = pool.join();
    info!(
        "All processing complete ({} succeeded, {} failed), exiting.",
        stats.succeeded, stats.failed
    );
    debug!("Final tracking counts: {:?}", store.counts());
    Ok(RunSummary { scanned, stats })
}

/// Log the effective options at startup.
pub fn log_run_config(opts: &Opts) {
    info!("Starting data file monitoring in {}", opts.dir.display());
    info!(
        "Watching for files with extensions: {}",
        ExtensionFilter::new(&opts.extensions).extensions().join(", ")
    );
    let show = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    };
    info!("Processing command: {}", show(&opts.script));
    info!("Task: {}", opts.task.as_deref().unwrap_or("<none>"));
    info!("Config: {}", show(&opts.config));
    info!("Output directory: {}", show(&opts.output));
    info!("Working directory: {}", show(&opts.work_dir));
    info!("Maximum concurrent processes: {}", opts.max_workers);
    info!("Maximum retries for failed files: {}", opts.max_retries);
    info!("Recursive: {}", opts.recursive);
}
