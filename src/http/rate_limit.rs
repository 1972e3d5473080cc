//! Proactive request pacing
//!
//! Uses the governor crate to spread requests over the API's quota window
//! before the server has to answer with a 429. Requests within the window's
//! quota may burst; beyond it they are held back evenly.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Default quota window (X API windows are 15 minutes)
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Configuration for request pacing
#[derive(Debug, Clone)]
pub struct PacerConfig {
    /// Requests allowed per window
    pub max_requests: u32,
    /// Length of the quota window
    pub window: Duration,
}

impl PacerConfig {
    /// Create a new pacer config
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// Create a config for a 15 minute window
    pub fn per_window(max_requests: u32) -> Self {
        Self::new(max_requests, DEFAULT_RATE_LIMIT_WINDOW)
    }
}

/// Token bucket pacing outgoing requests
#[derive(Clone)]
pub struct RequestPacer {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RequestPacer {
    /// Create a new pacer with the given config
    pub fn new(config: &PacerConfig) -> Self {
        let max_requests = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
        let period = config.window / max_requests.get();

        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(max_requests))
            .allow_burst(max_requests);

        Self {
            limiter: Arc::new(Governor::direct(quota)),
        }
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a permit, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer").finish()
    }
}
