//! Eegwatch: directory watchdog that dispatches new data files to an external processing command

pub mod engine;
pub mod pipeline;
pub mod run;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use engine::TrackingStore;
pub use run::{RunSummary, run_watchdog, run_watchdog_with};

/// Result alias used by public eegwatch API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
