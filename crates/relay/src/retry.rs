//! Bounded retry with exponential back-off.
//!
//! The loop is generic over the operation and over a [`Sleeper`], so the
//! back-off schedule can be asserted in tests without real waiting.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{CrmError, Sleeper};

/// Default number of attempts, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay after the first failed attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// How often and how patiently to retry a CRM read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySchedule {
    /// Total attempts, the first one included. Always at least 1.
    pub max_attempts: u32,
    /// Delay after the first failure; doubled after each further failure.
    pub base_delay: Duration,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetrySchedule {
    /// Creates a schedule; `max_attempts` is raised to 1 if zero.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after `failed_attempt` (1-based) before the next one.
    ///
    /// `base * 2^(failed_attempt - 1)`, saturating.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// The longest scheduled delay, the one before the final attempt.
    ///
    /// Also the ceiling for a server's `Retry-After` hint.
    pub fn max_delay(&self) -> Duration {
        self.delay_after(self.max_attempts.saturating_sub(1).max(1))
    }

    fn delay_with_hint(&self, failed_attempt: u32, hint: Option<Duration>) -> Duration {
        let scheduled = self.delay_after(failed_attempt);
        hint.map_or(scheduled, |after| scheduled.max(after.min(self.max_delay())))
    }
}

/// A value produced by [`retry_fetch`] together with the attempt that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    /// The successful result.
    pub value: T,
    /// 1-based number of the successful attempt.
    pub attempts: u32,
}

/// The last error of an exhausted [`retry_fetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted {
    /// The final error.
    pub last: CrmError,
    /// Attempts made.
    pub attempts: u32,
}

/// Runs `operation` until it succeeds or the schedule is exhausted.
///
/// A `Retry-After` hint larger than the scheduled delay replaces it, up to
/// [`RetrySchedule::max_delay`], so the total wait never exceeds
/// `(max_attempts - 1) * max_delay`. `context` is only used in log lines.
pub async fn retry_fetch<T, F, Fut, S>(
    schedule: &RetrySchedule,
    sleeper: &S,
    context: &str,
    mut operation: F,
) -> Result<Attempted<T>, Exhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, CrmError>>,
    S: Sleeper + ?Sized,
{
    let max_attempts = schedule.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let err = match operation(attempt).await {
            Ok(value) => {
                return Ok(Attempted {
                    value,
                    attempts: attempt,
                })
            }
            Err(err) => err,
        };

        if attempt >= max_attempts {
            warn!(context, attempt, error = %err, "CRM read failed; giving up");
            return Err(Exhausted {
                last: err,
                attempts: attempt,
            });
        }

        let delay = schedule.delay_with_hint(attempt, err.retry_after());
        warn!(
            context,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "CRM read failed; retrying"
        );
        sleeper.sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
