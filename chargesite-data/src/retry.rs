//! Bounded exponential-backoff retry for provider calls.
//!
//! [`RetryPolicy`] is independent of any particular provider: it repeats an
//! async operation while [`ProviderError::is_transient`] holds, waiting
//! `base_delay * 2^(n-1)` after the `n`-th failure. The wait itself is
//! injectable through [`RetryPolicy::run_with`] so tests never sleep.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use chargesite_data::RetryPolicy;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.max_attempts(), 3);
//! assert_eq!(policy.delay_for(1), Duration::from_millis(500));
//! assert_eq!(policy.delay_for(2), Duration::from_millis(1_000));
//! ```

use std::future::Future;
use std::time::Duration;

use chargesite_core::ProviderError;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

/// Default number of attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default wait after the first failure.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Retry parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` below one is raised to one.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        let max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Policy that tries once and never waits.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Maximum number of attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before the first retry.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Wait after the `failures`-th consecutive failure.
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        let factor = 2_u32.saturating_pow(failures.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Run `operation` with Tokio timers between attempts.
    ///
    /// # Errors
    /// See [`RetryPolicy::run_with`].
    pub async fn run<T, Op, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: Op,
    ) -> Result<T, ProviderError>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        self.run_with(cancel, operation, tokio::time::sleep).await
    }

    /// Run `operation`, waiting through `delay` between attempts.
    ///
    /// Cancellation is observed both while an attempt is in flight and while
    /// waiting.
    ///
    /// # Errors
    /// Returns the first non-transient error unchanged,
    /// [`ProviderError::Exhausted`] wrapping the last error once every
    /// attempt failed transiently, and [`ProviderError::Cancelled`] when
    /// `cancel` fires.
    pub async fn run_with<T, Op, Fut, Delay, DelayFut>(
        &self,
        cancel: &CancellationToken,
        mut operation: Op,
        mut delay: Delay,
    ) -> Result<T, ProviderError>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
        Delay: FnMut(Duration) -> DelayFut,
        DelayFut: Future<Output = ()>,
    {
        let mut attempt = 1;
        loop {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ProviderError::Cancelled),
                result = operation() => result,
            };
            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_transient() => return Err(error),
                Err(error) => error,
            };
            if attempt >= self.max_attempts {
                warn!("giving up after {attempt} attempts: {error}");
                return Err(ProviderError::Exhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }
            let wait = self.delay_for(attempt);
            warn!(
                "attempt {attempt}/{} failed: {error}; retrying in {wait:?}",
                self.max_attempts
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("retry wait cancelled");
                    return Err(ProviderError::Cancelled);
                }
                () = delay(wait) => {}
            }
            attempt += 1;
        }
    }
}
