//! Retry with exponential backoff on version conflicts
//!
//! Only [`Error::VersionConflict`] is retried. Validation errors, missing
//! records, scheduling conflicts and duplicates propagate on the first
//! attempt because retrying them cannot change the outcome.
//!
//! The operation must re-read whatever it depends on each time it is
//! invoked; replaying a write with a stale expected version only fails the
//! same way again.

use slotguard_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry budget and backoff shape
///
/// # Example
/// ```
/// use slotguard_concurrency::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new()
///     .with_max_attempts(5)
///     .with_base_delay(Duration::from_millis(20));
/// assert_eq!(policy.delay_for(3), Duration::from_millis(80));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    /// Create a RetryPolicy with default values (3 attempts, 100ms base)
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, never retried
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Set the total number of attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set base delay for exponential backoff
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Cap every delay at `max_delay`
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Reject a policy that could never run the operation
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::validation("max_attempts", "must be at least 1"));
        }
        Ok(())
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    ///
    /// `base_delay * 2^(attempt - 1)`, saturating, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Cap the shift to prevent overflow
        let shift = attempt.saturating_sub(1).min(31);
        let delay = self.base_delay.saturating_mul(1u32 << shift);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

/// Runs operations under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
pub struct RetryCoordinator {
    policy: RetryPolicy,
}

impl RetryCoordinator {
    /// Coordinator using `policy`
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The active policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation`, retrying version conflicts with backoff
    ///
    /// # Returns
    /// * `Ok(T)` - the first successful result
    /// * `Err` - the first non-conflict error, or the last conflict once
    ///   `max_attempts` attempts have failed
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    warn!(attempts = attempt, error = %e, "Retry budget exhausted");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.policy.delay_for(attempt);
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Version conflict, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Execute `operation` under `policy`
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    RetryCoordinator::new(policy.clone()).run(operation).await
}
