use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// Exponential delay with jitter, see [`calculate_backoff`].
    Exponential { base: Duration, max: Duration },
}

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Zero behaves as one.
    pub max_attempts: u8,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u8, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Policy for optimistic write conflicts: 3 attempts, 100ms apart.
    pub const fn write_conflict() -> Self {
        Self::new(3, Backoff::Fixed(Duration::from_millis(100)))
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u8) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                calculate_backoff(attempt, base.as_millis() as u64, max.as_millis() as u64)
            }
        }
    }

    fn attempts(&self) -> u8 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::write_conflict()
    }
}

/// Error returned by [`retry`] when the operation did not succeed.
#[derive(Debug)]
pub struct RetryError<E> {
    /// Number of attempts actually made.
    pub attempts: u8,
    /// Error from the final attempt.
    pub last: E,
    /// `true` when the attempt budget ran out on a retryable error,
    /// `false` when a non-retryable error stopped the loop early.
    pub exhausted: bool,
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        self.last
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exhausted {
            write!(f, "gave up after {} attempts: {}", self.attempts, self.last)
        } else {
            write!(f, "{}", self.last)
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempt budget is spent.
///
/// `is_retryable` classifies errors. The delay is only slept when another
/// attempt will follow.
pub async fn retry<T, E, F, Fut, P>(
    policy: RetryPolicy,
    is_retryable: P,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u8) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: fmt::Display,
{
    let max_attempts = policy.attempts();
    let mut attempt: u8 = 0;

    loop {
        attempt += 1;
        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retryable(&err) {
            return Err(RetryError {
                attempts: attempt,
                last: err,
                exhausted: false,
            });
        }

        if attempt >= max_attempts {
            return Err(RetryError {
                attempts: attempt,
                last: err,
                exhausted: true,
            });
        }

        let delay = policy.delay_for(attempt);
        warn!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retryable failure, trying again"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Calculate exponential backoff delay with jitter.
///
/// Formula: `min(base_ms * 2^(attempt-1) + jitter, max_ms)` (0-25% jitter)
pub fn calculate_backoff(attempt: u8, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exp_factor = 2u64.saturating_pow((attempt - 1) as u32);
    let delay_ms = base_ms.saturating_mul(exp_factor);

    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };

    let total_delay = delay_ms.saturating_add(jitter).min(max_ms);
    Duration::from_millis(total_delay)
}
