//! Bounded retry with pluggable backoff.
//!
//! The two execution backends need three different retry shapes: a fixed
//! attempt count for subprocess invocations, a fixed polling interval bounded
//! by wall-clock time for remote jobs, and exponential backoff inside a short
//! deadline for artifact fetches. All three are expressed through one
//! [`RetryPolicy`] so the shapes are declared in one place.

use std::thread;
use std::time::{Duration, Instant};

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Sleep a constant interval between attempts.
    Fixed(Duration),
    /// Double the delay each attempt, capped.
    Exponential { base: Duration, cap: Duration },
}

/// One retry attempt's outcome, as reported by the operation closure.
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// Success; stop retrying.
    Done(T),
    /// Transient failure; retry if budget remains.
    Retry(E),
    /// Permanent failure; stop immediately regardless of budget.
    Abort(E),
}

/// A bounded retry loop: attempt count and/or wall-clock deadline.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub deadline: Option<Duration>,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// N immediate attempts, no delay. Used for subprocess invocations.
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            deadline: None,
            backoff: Backoff::None,
        }
    }

    /// Fixed-interval attempts until a wall-clock deadline. Used for remote
    /// job polling.
    pub fn fixed(interval: Duration, deadline: Duration) -> Self {
        Self {
            max_attempts: None,
            deadline: Some(deadline),
            backoff: Backoff::Fixed(interval),
        }
    }

    /// Exponential backoff inside a wall-clock deadline. Used for remote
    /// artifact fetches.
    pub fn exponential(base: Duration, cap: Duration, deadline: Duration) -> Self {
        Self {
            max_attempts: None,
            deadline: Some(deadline),
            backoff: Backoff::Exponential { base, cap },
        }
    }

    /// Delay to sleep after attempt number `attempt` (1-based).
    fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(interval) => interval,
            Backoff::Exponential { base, cap } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(factor).min(cap)
            }
        }
    }

    /// Run `op` until it reports [`Attempt::Done`], aborts, or the budget is
    /// spent. The closure receives the 1-based attempt number. Returns the
    /// last error when the budget runs out.
    pub fn run<T, E>(&self, mut op: impl FnMut(u32) -> Attempt<T, E>) -> Result<T, E> {
        let started = Instant::now();
        let mut attempt = 1u32;
        loop {
            match op(attempt) {
                Attempt::Done(value) => return Ok(value),
                Attempt::Abort(err) => return Err(err),
                Attempt::Retry(err) => {
                    if let Some(max) = self.max_attempts {
                        if attempt >= max {
                            return Err(err);
                        }
                    }
                    let delay = self.delay_after(attempt);
                    if let Some(deadline) = self.deadline {
                        if started.elapsed() + delay >= deadline {
                            return Err(err);
                        }
                    }
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
