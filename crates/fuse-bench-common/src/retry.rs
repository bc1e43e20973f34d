//! Bounded fixed-delay retry policy
//!
//! Package installation on a freshly booted instance races the distro's own
//! update machinery, so the install command is retried a fixed number of
//! times with a constant delay. No backoff growth, no jitter.

use backon::{ConstantBuilder, Retryable};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// A bounded retry policy with a constant delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub max_attempts: u32,
    /// Delay between consecutive attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with `max_attempts` total attempts separated by `delay`
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Build the backon backoff for this policy.
    ///
    /// backon counts retries after the first attempt, so the builder is
    /// given `max_attempts - 1` retries.
    pub fn backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// Run `op`, retrying per `policy` until it succeeds or attempts run out.
///
/// Returns the first `Ok`, or the error of the final attempt. Each retry
/// is logged with the operation label.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    op.retry(policy.backoff())
        .notify(|err, dur| {
            warn!(
                operation = %label,
                delay = ?dur,
                error = %err,
                "Attempt failed, retrying"
            );
        })
        .await
}
