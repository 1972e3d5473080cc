//! Rate-limit throttle
//!
//! Turns a 429 response into an explicit wait. The throttle only computes the
//! wait; the retry policy performs it through a [`Sleeper`], so neither the
//! classifier nor the throttle ever block.
//!
//! ```text
//! sleep = (x-rate-limit-reset - now) + buffer
//! ```

use super::client::HttpResponse;
use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// Header carrying the remaining request quota
pub const DEFAULT_REMAINING_HEADER: &str = "x-rate-limit-remaining";

/// Header carrying the quota reset time (Unix epoch seconds)
pub const DEFAULT_RESET_HEADER: &str = "x-rate-limit-reset";

/// Added to every computed wait to absorb client/server clock skew
pub const DEFAULT_RESET_BUFFER: Duration = Duration::from_secs(60);

/// Upper bound on a single rate-limit wait
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(3600);

// ============================================================================
// Time sources
// ============================================================================

/// Source of the current Unix time
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time in whole seconds since the Unix epoch
    fn unix_now(&self) -> i64;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Something that can suspend the current task
#[async_trait]
pub trait Sleeper: Send + Sync + fmt::Debug {
    /// Suspend for the given duration
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A clock frozen at a fixed Unix time
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn unix_now(&self) -> i64 {
        self.0
    }
}

/// Records requested sleeps and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Create a new recording sleeper
    pub fn new() -> Self {
        Self::default()
    }

    /// All sleeps requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
    }
}

// ============================================================================
// Throttle
// ============================================================================

/// Configuration for rate-limit waits
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Name of the remaining-quota header
    pub remaining_header: String,
    /// Name of the quota-reset header
    pub reset_header: String,
    /// Buffer added to the time until reset
    pub buffer: Duration,
    /// Cap on a single wait
    pub max_wait: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            remaining_header: DEFAULT_REMAINING_HEADER.to_string(),
            reset_header: DEFAULT_RESET_HEADER.to_string(),
            buffer: DEFAULT_RESET_BUFFER,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// The wait computed for one rate-limited response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitWait {
    /// How long to wait before retrying
    pub duration: Duration,
    /// Remaining quota reported by the server, if any
    pub remaining: Option<u64>,
    /// Reset timestamp reported by the server, if any
    pub reset: Option<i64>,
}

/// Computes rate-limit waits from response headers
#[derive(Debug, Clone)]
pub struct Throttle {
    config: ThrottleConfig,
    clock: Arc<dyn Clock>,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

impl Throttle {
    /// Create a throttle on the system clock
    pub fn new(config: ThrottleConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a throttle on a custom clock
    pub fn with_clock(config: ThrottleConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Get the throttle configuration
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Compute how long to wait before retrying a rate-limited request.
    ///
    /// Never negative. Without a reset header the wait is the buffer alone.
    pub fn wait_for(&self, response: &HttpResponse) -> RateLimitWait {
        let remaining: Option<u64> = parse_header(response, &self.config.remaining_header);
        let reset: Option<i64> = parse_header(response, &self.config.reset_header);
        let buffer_secs = i64::try_from(self.config.buffer.as_secs()).unwrap_or(i64::MAX);
        let max_secs = i64::try_from(self.config.max_wait.as_secs()).unwrap_or(i64::MAX);

        let remaining_display = remaining.map_or_else(|| "unknown".to_string(), |r| r.to_string());
        info!(
            "Rate limit reached. {}: {}. Waiting for reset...",
            self.config.remaining_header, remaining_display
        );

        let sleep_secs = if let Some(reset) = reset {
            let now = self.clock.unix_now();
            let seconds_till_reset = reset.saturating_sub(now);
            info!(
                "{} at: {}. current time is: {}. seconds till reset: {}",
                self.config.reset_header, reset, now, seconds_till_reset
            );
            seconds_till_reset.saturating_add(buffer_secs)
        } else {
            warn!(
                "Rate limit quota headers missing ({} / {}), falling back to a {}s wait",
                self.config.remaining_header, self.config.reset_header, buffer_secs
            );
            buffer_secs
        };

        let clamped = sleep_secs.clamp(0, max_secs.max(0));
        if clamped != sleep_secs {
            warn!("Rate limit wait of {}s clamped to {}s", sleep_secs, clamped);
        }

        RateLimitWait {
            duration: Duration::from_secs(clamped as u64),
            remaining,
            reset,
        }
    }
}

/// Parse a numeric header; unparsable values count as absent
fn parse_header<T: FromStr>(response: &HttpResponse, name: &str) -> Option<T> {
    let raw = response.header(name)?;
    if let Ok(value) = raw.trim().parse() {
        Some(value)
    } else {
        warn!("Ignoring unparsable {} header: {:?}", name, raw);
        None
    }
}
