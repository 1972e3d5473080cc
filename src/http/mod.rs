//! HTTP module
//!
//! Everything between "fetch this page" and a usable response.
//!
//! # Features
//!
//! - **Classification**: Success, RateLimited, Retriable and Fatal outcomes
//! - **Rate-limit throttle**: waits derived from quota reset headers
//! - **Retry policy**: bounded attempts with constant, linear or exponential backoff
//! - **Pacing**: optional token bucket using governor

mod classify;
mod client;
mod rate_limit;
mod retry;
mod throttle;

pub use classify::{classify, classify_status, Classification, ResponseClass};
pub use client::{
    HttpClient, HttpClientConfig, HttpClientConfigBuilder, HttpResponse, RequestDescriptor,
    RequestDescriptorBuilder, DEFAULT_USER_AGENT,
};
pub use rate_limit::{PacerConfig, RequestPacer, DEFAULT_RATE_LIMIT_WINDOW};
pub use retry::{RetryConfig, RetryPolicy, DEFAULT_MAX_ATTEMPTS};
pub use throttle::{
    Clock, FixedClock, RateLimitWait, RecordingSleeper, Sleeper, SystemClock, Throttle,
    ThrottleConfig, TokioSleeper, DEFAULT_MAX_WAIT, DEFAULT_REMAINING_HEADER,
    DEFAULT_RESET_BUFFER, DEFAULT_RESET_HEADER,
};
