//! Retry decision table, separate from the transport so the policy can be
//! checked synchronously in tests. Backoff grows linearly: attempt × base.

use std::time::Duration;

use super::error::ClassifyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    Fail,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// `attempt` is 1-based: the attempt that just failed.
    pub fn decide(&self, err: ClassifyError, attempt: u32) -> RetryDecision {
        if !err.retryable() || attempt >= self.max_attempts {
            return RetryDecision::Fail;
        }
        RetryDecision::Retry(self.base_delay * attempt)
    }
}
