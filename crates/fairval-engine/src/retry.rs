//! Retry logic with exponential backoff
//!
//! Provider calls are retried on transient failures only. Each attempt is
//! bounded by a timeout, and a timeout counts as a transient failure.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::SourceError;
use crate::sources::SourceKind;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Backoff before the first retry
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,

    /// Backoff multiplier (typically 2.0 for exponential backoff)
    pub backoff_multiplier: f64,

    /// Timeout of each attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl RetryPolicy {
    /// Derive the policy from engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_attempts: config.max_retries.saturating_add(1),
            initial_backoff: config.retry_backoff_base,
            max_backoff: config.retry_backoff_max,
            backoff_multiplier: 2.0,
            attempt_timeout: config.request_timeout,
        }
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            attempt_timeout: Duration::from_secs(5),
        }
    }

    /// Create a policy with fast retries (for testing)
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
            backoff_multiplier: 2.0,
            attempt_timeout: Duration::from_millis(200),
        }
    }

    /// Calculate backoff duration before the given retry (1-based)
    fn backoff_duration(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let backoff_ms = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi((retry - 1) as i32);

        Duration::from_millis(backoff_ms as u64).min(self.max_backoff)
    }

    /// Run a provider call until it succeeds, fails permanently, or the
    /// attempts run out. Returns the last error in the latter cases.
    pub async fn execute<F, Fut, T>(&self, provider: SourceKind, mut operation: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("Attempt {}/{} for {} source", attempt, attempts, provider);

            let outcome = match timeout(self.attempt_timeout, operation()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(SourceError::timeout(provider, self.attempt_timeout)),
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} source succeeded after {} retries", provider, attempt - 1);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !error.is_transient() {
                debug!("{} source failed with non-retryable error: {}", provider, error);
                return Err(error);
            }

            if attempt >= attempts {
                warn!("{} source failed after {} attempts: {}", provider, attempts, error);
                return Err(error);
            }

            let backoff = self.backoff_duration(attempt);
            warn!(
                "{} source failed (attempt {}/{}): {}. Retrying in {:?}",
                provider, attempt, attempts, error, backoff
            );
            sleep(backoff).await;
        }
    }
}
