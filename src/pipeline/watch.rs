//! Live feed: forward filesystem creation events to a [`FileEventSink`].

use anyhow::{Context, Result};
use log::{error, info};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;

use super::controller::FileEventSink;

/// Running filesystem watch. Dropping it stops event delivery.
pub struct LiveFeed {
    _watcher: RecommendedWatcher,
}

/// Paths from a creation event; other event kinds yield nothing.
pub fn created_paths(event: &Event) -> &[std::path::PathBuf] {
    match event.kind {
        EventKind::Create(_) => event.paths.as_slice(),
        _ => &[],
    }
}

/// Subscribe to creation events under `dir` and pass each created path to `sink`.
pub fn start_live_feed(
    dir: &Path,
    recursive: bool,
    sink: Arc<dyn FileEventSink>,
) -> Result<LiveFeed> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in created_paths(&event) {
                    sink.on_file_created(path);
                }
            }
            Err(e) => error!("Watch error: {:?}", e),
        },
        Config::default(),
    )
    .context("create filesystem watcher")?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    watcher
        .watch(dir, mode)
        .with_context(|| format!("watch {}", dir.display()))?;
    info!("Watching {} ({:?})", dir.display(), mode);
    Ok(LiveFeed { _watcher: watcher })
}
