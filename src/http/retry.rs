//! Retry policy
//!
//! Wraps single attempts of [`HttpClient::send`] into one logical "fetch this
//! page" operation. Each attempt is classified; the policy either returns the
//! response, waits and tries again, or gives up.
//!
//! | Outcome       | Action                                   |
//! |---------------|------------------------------------------|
//! | `Success`     | return the response                      |
//! | `RateLimited` | wait until the quota resets, retry       |
//! | `Retriable`   | back off, retry                          |
//! | transport     | timeouts/connect errors back off, retry  |
//! | `Fatal`       | `Error::Fatal`, no retry                 |
//!
//! Every attempt, rate-limited ones included, consumes one slot of
//! `max_attempts`. Running out yields `Error::ExhaustedRetries`.

use super::classify::{classify, error_message, Classification};
use super::client::{HttpClient, HttpResponse, RequestDescriptor};
use super::rate_limit::RequestPacer;
use super::throttle::{Sleeper, Throttle, TokioSleeper};
use crate::error::{Error, Result};
use crate::types::BackoffType;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default number of attempts per page (initial attempt included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts per request, including the first
    pub max_attempts: u32,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_type: BackoffType::Exponential,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Set max attempts
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set backoff configuration
    #[must_use]
    pub fn with_backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }
}

/// Bounded retry around single HTTP attempts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    throttle: Throttle,
    sleeper: Arc<dyn Sleeper>,
    pacer: Option<RequestPacer>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Create a policy with the default throttle and the tokio timer
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            throttle: Throttle::default(),
            sleeper: Arc::new(TokioSleeper),
            pacer: None,
        }
    }

    /// Replace the rate-limit throttle
    #[must_use]
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Replace the sleeper used for backoff and rate-limit waits
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Pace every attempt through a token bucket
    #[must_use]
    pub fn with_pacer(mut self, pacer: RequestPacer) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Get the retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Check if proactive pacing is enabled
    pub fn has_pacer(&self) -> bool {
        self.pacer.is_some()
    }

    /// Calculate backoff delay for a given retry (0-based)
    pub fn calculate_backoff(&self, retry: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff.saturating_mul(retry + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(retry);
                self.config.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }

    /// Send `request` until it succeeds, fails fatally, or attempts run out
    pub async fn execute_with_retry(
        &self,
        client: &HttpClient,
        request: &RequestDescriptor,
    ) -> Result<HttpResponse> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if let Some(ref pacer) = self.pacer {
                pacer.wait().await;
            }

            let delay = match client.send(request).await {
                Ok(response) => match classify(response) {
                    Classification::Success(response) => {
                        if attempt > 1 {
                            debug!(
                                "Request to {} succeeded on attempt {}/{}",
                                request.path(),
                                attempt,
                                max_attempts
                            );
                        }
                        return Ok(response);
                    }
                    Classification::Fatal(response, reason) => {
                        return Err(Error::fatal(response.status(), reason));
                    }
                    Classification::RateLimited(response) => {
                        last_error = error_message(&response);
                        self.throttle.wait_for(&response).duration
                    }
                    Classification::Retriable(_, reason) => {
                        let delay = self.calculate_backoff(attempt - 1);
                        warn!(
                            "{}, attempt {}/{}, retrying in {:?}",
                            reason, attempt, max_attempts, delay
                        );
                        last_error = reason;
                        delay
                    }
                },
                Err(e) if e.is_retryable() => {
                    let delay = self.calculate_backoff(attempt - 1);
                    warn!(
                        "Request to {} failed: {}, attempt {}/{}, retrying in {:?}",
                        request.path(),
                        e,
                        attempt,
                        max_attempts,
                        delay
                    );
                    last_error = e.to_string();
                    delay
                }
                Err(e) => return Err(e),
            };

            if attempt < max_attempts {
                let secs = delay.as_secs_f64();
                info!(
                    "Sleeping for {:.0} seconds or {:.2} minutes",
                    secs,
                    secs / 60.0
                );
                self.sleeper.sleep(delay).await;
            }
        }

        Err(Error::exhausted(max_attempts, last_error))
    }
}
