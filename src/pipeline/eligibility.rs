use log::{info, warn};

use crate::engine::db_ops::TrackingStore;
use crate::{Decision, RetryLimit, SkipReason};

/// Decides whether a file identity should be processed now. Reads the store, never writes it.
#[derive(Clone, Copy, Debug, Default)]
pub struct EligibilityPolicy {
    max_retries: RetryLimit,
}

impl EligibilityPolicy {
    pub fn new(max_retries: RetryLimit) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> RetryLimit {
        self.max_retries
    }

    /// Succeeded → skip; retries used up → skip; otherwise process with the current retry count.
    pub fn evaluate(&self, store: &TrackingStore, name: &str) -> Decision {
        if store.is_succeeded(name) {
            return Decision::Skip(SkipReason::AlreadySucceeded);
        }
        let retry_count = store.retry_count_of(name);
        if self.max_retries.is_exhausted(retry_count) {
            warn!(
                "File {} has reached max retries ({}). Skipping.",
                name, self.max_retries
            );
            return Decision::Skip(SkipReason::RetriesExhausted { retry_count });
        }
        if retry_count > 0 {
            info!(
                "Retrying file {} (attempt {}/{})",
                name,
                retry_count + 1,
                self.max_retries
            );
        }
        Decision::Process { retry_count }
    }
}
