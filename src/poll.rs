//! Timeout-bounded cooperative polling.
//!
//! Every long wait in this crate is a [`PollStep`] advanced by
//! [`poll_until`]. A step inspects state (pumping the transport if it needs
//! to) and answers either [`Step::Done`] or [`Step::Continue`] with the delay
//! it would like before the next look. The driver owns the budget:
//!
//! 1. `deadline = now + timeout`
//! 2. advance the step
//! 3. `Done(value)` returns at once, without sleeping
//! 4. `Continue(delay)`: if no budget remains fail with
//!    [`Error::OperationTimedOut`], otherwise sleep `min(delay, remaining)`
//!    and go to 2
//!
//! An error returned by a step aborts the wait immediately; it is never
//! treated as "not yet".
//!
//! Time is read through a [`Clock`] so waits can be driven by virtual time.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Step
// ============================================================================

/// Outcome of advancing a poll step once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// The awaited condition holds.
    Done(T),
    /// Not yet; suggested delay before the next attempt.
    Continue(Duration),
}

/// A resumable condition check.
///
/// All state that must survive between attempts lives in the implementing
/// type, never in the driver.
#[async_trait]
pub trait PollStep: Send {
    /// Value produced once the condition holds.
    type Output: Send;

    /// Advances the check by one attempt.
    async fn step(&mut self) -> Result<Step<Self::Output>>;
}

// ============================================================================
// Clock
// ============================================================================

/// Time source and sleep primitive used by the poll driver.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Converts a caller timeout in milliseconds into the driver's budget.
///
/// This and [`millis_of`] are the only places the crate converts between
/// the public millisecond unit and [`Duration`].
#[inline]
#[must_use]
pub const fn timeout_from_millis(timeout_ms: u64) -> Duration {
    Duration::from_millis(timeout_ms)
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
#[inline]
#[must_use]
pub fn millis_of(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Advances `step` until it completes or `timeout` elapses.
///
/// # Errors
///
/// - [`Error::OperationTimedOut`] if the budget runs out first
/// - any error returned by the step itself
pub async fn poll_until<S>(
    step: &mut S,
    timeout: Duration,
    clock: &dyn Clock,
    operation: &str,
) -> Result<S::Output>
where
    S: PollStep + ?Sized,
{
    let deadline = clock.now() + timeout;

    loop {
        match step.step().await? {
            Step::Done(value) => return Ok(value),
            Step::Continue(delay) => {
                let remaining = deadline.saturating_duration_since(clock.now());
                if remaining.is_zero() {
                    return Err(Error::timed_out(operation, millis_of(timeout)));
                }

                let nap = delay.min(remaining);
                trace!(operation, nap_ms = millis_of(nap), "Polling again");
                clock.sleep(nap).await;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
