//! Detection → eligibility → queue → pool → dispatch → tracking.

pub mod controller;
pub mod dispatch;
pub mod eligibility;
pub mod pool;
pub mod queue;
pub mod watch;

pub use controller::{Detection, ExtensionFilter, FileEventSink, WatchController};
pub use dispatch::{CommandDispatcher, Dispatch, command_args, ensure_invocable};
pub use eligibility::EligibilityPolicy;
pub use pool::{PoolStats, WorkerPool, run_job};
pub use queue::{Dequeue, JobReceiver, JobSender, work_queue};
pub use watch::{LiveFeed, created_paths, start_live_feed};
