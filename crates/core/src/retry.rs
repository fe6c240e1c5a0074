//! Retry decision function for the dispatch pipeline.
//!
//! Pure logic: the dispatcher asks [`RetryPolicy::decide`] after each failed
//! attempt and performs the sleep itself (inside its background task -- no
//! client-facing thread ever waits on a retry interval).

use std::time::Duration;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after sleeping for the contained duration.
    Retry(Duration),
    /// Attempts are exhausted; classify and record the failure.
    GiveUp,
}

/// Attempt limit and spacing for one phase of the dispatch pipeline.
///
/// The health-check and submit phases carry independently configured
/// policies. The two phases historically counted differently and both
/// behaviours are preserved: [`RetryPolicy::preflight`] grants a first try
/// *plus* the configured number of retries, while [`RetryPolicy::submit`]
/// treats the configured value as the total attempt count.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts permitted (first try included).
    pub max_attempts: u32,
    /// Sleep between consecutive attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    /// Policy for the preflight health check: one initial try plus
    /// `max_retries` retries.
    pub fn preflight(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            interval,
        }
    }

    /// Policy for the submit phase: exactly `max_attempts` attempts total.
    pub fn submit(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Decide whether another attempt is allowed.
    ///
    /// `attempts_made` is the 0-indexed number of attempts already
    /// performed (so after the first failure the caller passes 1).
    pub fn decide(&self, attempts_made: u32) -> RetryDecision {
        if attempts_made < self.max_attempts {
            RetryDecision::Retry(self.interval)
        } else {
            RetryDecision::GiveUp
        }
    }
}
