//! Completion poller: re-checks a submitted-but-unconfirmed upload on a
//! fixed interval, bounded by a maximum number of attempts.
//!
//! Each wait is a non-blocking timer suspension raced against the owning
//! operation's cancellation signal, so an invalidated cache entry stops
//! polling immediately instead of leaking a recurring timer.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::UploadOperation;
use crate::error::{Result, TransmitError};

/// Fixed-interval, bounded-attempt polling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    /// `max_attempts` is clamped to at least one check.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 10,
        }
    }
}

/// Outcome of one status check.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// Upload still in flight on the remote end.
    Pending,
    /// Upload confirmed; carries the final resource locator.
    Complete(String),
}

/// Poll `check` until it confirms completion, fails, or every allowed
/// attempt is spent. Exactly `max_attempts` checks run in the timeout case.
pub async fn poll<C, Fut>(
    operation: &UploadOperation,
    policy: &PollPolicy,
    mut check: C,
) -> Result<String>
where
    C: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus>>,
{
    operation.mark_polling();
    while operation.attempts() < policy.max_attempts {
        tokio::select! {
            _ = operation.cancelled() => {
                info!(operation = %operation.id(), "Polling stopped: operation cancelled");
                return Err(TransmitError::Cancelled(
                    "upload cache entry invalidated while polling".into(),
                ));
            }
            _ = tokio::time::sleep(policy.interval) => {}
        }
        let attempt = operation.record_attempt();
        debug!(
            operation = %operation.id(),
            attempt,
            max_attempts = policy.max_attempts,
            "Checking upload status"
        );
        match check().await? {
            PollStatus::Complete(locator) => {
                info!(operation = %operation.id(), attempt, locator = %locator, "Upload confirmed");
                return Ok(locator);
            }
            PollStatus::Pending => {}
        }
    }
    warn!(
        operation = %operation.id(),
        attempts = policy.max_attempts,
        "Upload status checks exhausted"
    );
    Err(TransmitError::Timeout {
        attempts: policy.max_attempts,
    })
}
