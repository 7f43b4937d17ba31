//! Bounded retry with exponential backoff.
//!
//! [`RetryPolicy`] is a plain value: callers hand it an async operation and
//! get back the final result together with the number of attempts issued.

use std::future::Future;
use std::time::Duration;

use firmaudit_types::RetrySettings;
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};

/// Backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Additional attempts after the first (default: 2).
    pub max_retries: u32,
    /// Delay before the first retry (default: 2 seconds).
    pub base_delay: Duration,
    /// Cap on any single delay (default: 30 seconds).
    pub max_delay: Duration,
    /// Random extra of up to this fraction of the delay (default: 0.25).
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.initial_backoff_ms),
            max_delay: Duration::from_millis(settings.max_backoff_ms),
            jitter_fraction: 0.25,
        }
    }
}

/// Transient failures: network errors, timeouts, 429 and 5xx, and
/// garbled completion bodies.
pub fn is_retryable(err: &ProviderError) -> bool {
    match err {
        ProviderError::RateLimited { .. }
        | ProviderError::ServerError { .. }
        | ProviderError::Timeout
        | ProviderError::Http(_)
        | ProviderError::InvalidResponse(_) => true,
        ProviderError::RequestFailed(_)
        | ProviderError::AuthFailed(_)
        | ProviderError::ModelNotFound(_)
        | ProviderError::InvalidConfig(_)
        | ProviderError::Json(_) => false,
    }
}

/// Final result of a retried operation.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    /// Calls issued, including the first.
    pub attempts: u32,
}

/// Exponential backoff policy.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Upper bound on calls issued by [`run`](Self::run).
    pub fn max_attempts(&self) -> u32 {
        self.config.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (0-indexed):
    /// `min(base * 2^retry, max)` plus jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base_ms = self.config.base_delay.as_millis() as u64;
        let cap_ms = self.config.max_delay.as_millis() as u64;
        let capped_ms = base_ms
            .saturating_mul(2u64.saturating_pow(retry))
            .min(cap_ms);

        let jitter_max_ms = (capped_ms as f64 * self.config.jitter_fraction) as u64;
        let jitter_ms = if jitter_max_ms > 0 {
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .subsec_nanos() as u64;
            nanos % (jitter_max_ms + 1)
        } else {
            0
        };
        Duration::from_millis(capped_ms + jitter_ms)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent. `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = label, attempt, "succeeded after retry");
                    }
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(err) if is_retryable(&err) && attempt < max_attempts => {
                    let mut delay = self.delay_for(attempt - 1);
                    if let ProviderError::RateLimited { retry_after_ms } = &err {
                        delay = delay
                            .max(Duration::from_millis(*retry_after_ms))
                            .min(self.config.max_delay);
                    }
                    warn!(
                        operation = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Attempted {
                        result: Err(err),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}
