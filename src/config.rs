//! Tap configuration
//!
//! Loaded from a JSON or YAML file (chosen by extension) or from an inline
//! JSON string. Everything except `auth_token` has a default.

use crate::error::{Error, Result};
use crate::http::{
    HttpClientConfig, PacerConfig, RequestPacer, RetryConfig, RetryPolicy, Throttle,
    ThrottleConfig, DEFAULT_USER_AGENT,
};
use crate::template::TemplateContext;
use crate::types::{BackoffType, OptionStringExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default API root
pub const DEFAULT_API_URL: &str = "https://api.x.com";

/// Configuration for one tap run
#[derive(Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Bearer token
    #[serde(default)]
    pub auth_token: String,

    /// User whose timeline is extracted
    #[serde(default)]
    pub user_id: Option<String>,

    /// API root
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Upper bound on pages per extraction
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// User-Agent header; `tap-twitter` when unset
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per page, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub backoff_type: BackoffType,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Seconds added to the rate-limit reset time
    #[serde(default = "default_rate_limit_buffer_secs")]
    pub rate_limit_buffer_secs: u64,

    /// Cap on a single rate-limit wait
    #[serde(default = "default_max_rate_limit_wait_secs")]
    pub max_rate_limit_wait_secs: u64,

    /// Proactive pacing: requests allowed per window (off when unset)
    #[serde(default)]
    pub requests_per_window: Option<u32>,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_max_pages() -> u32 {
    15
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_rate_limit_buffer_secs() -> u64 {
    60
}

fn default_max_rate_limit_wait_secs() -> u64 {
    3600
}

fn default_rate_limit_window_secs() -> u64 {
    900
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            user_id: None,
            api_url: default_api_url(),
            max_pages: default_max_pages(),
            user_agent: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_type: BackoffType::default(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            rate_limit_buffer_secs: default_rate_limit_buffer_secs(),
            max_rate_limit_wait_secs: default_max_rate_limit_wait_secs(),
            requests_per_window: None,
            rate_limit_window_secs: default_rate_limit_window_secs(),
        }
    }
}

impl fmt::Debug for TapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TapConfig")
            .field("auth_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("api_url", &self.api_url)
            .field("max_pages", &self.max_pages)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_type", &self.backoff_type)
            .field("initial_backoff_ms", &self.initial_backoff_ms)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .field("rate_limit_buffer_secs", &self.rate_limit_buffer_secs)
            .field("max_rate_limit_wait_secs", &self.max_rate_limit_wait_secs)
            .field("requests_per_window", &self.requests_per_window)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .finish()
    }
}

impl TapConfig {
    /// Load from a file; `.yaml`/`.yml` is YAML, anything else JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<()> {
        if self.auth_token.trim().is_empty() {
            return Err(Error::missing_field("auth_token"));
        }

        let url = url::Url::parse(&self.api_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "api_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if self.max_pages == 0 {
            return Err(Error::invalid_value("max_pages", "must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(Error::invalid_value("max_attempts", "must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::invalid_value(
                "request_timeout_secs",
                "must be at least 1",
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(Error::invalid_value(
                "initial_backoff_ms",
                "must not exceed max_backoff_ms",
            ));
        }
        if self.requests_per_window == Some(0) {
            return Err(Error::invalid_value(
                "requests_per_window",
                "must be at least 1 when set",
            ));
        }
        if self.requests_per_window.is_some() && self.rate_limit_window_secs == 0 {
            return Err(Error::invalid_value(
                "rate_limit_window_secs",
                "must be at least 1",
            ));
        }

        Ok(())
    }

    /// Client settings: base URL, timeout, bearer token and User-Agent
    pub fn http_client_config(&self) -> HttpClientConfig {
        let user_agent = self
            .user_agent
            .clone()
            .none_if_empty()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        HttpClientConfig::builder()
            .base_url(&self.api_url)
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .user_agent(user_agent)
            .bearer_token(&self.auth_token)
            .build()
    }

    /// Retry policy with this config's backoff, throttle and pacing
    pub fn retry_policy(&self) -> RetryPolicy {
        let retry = RetryConfig::default()
            .with_max_attempts(self.max_attempts)
            .with_backoff(
                self.backoff_type,
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            );
        let throttle = ThrottleConfig {
            buffer: Duration::from_secs(self.rate_limit_buffer_secs),
            max_wait: Duration::from_secs(self.max_rate_limit_wait_secs),
            ..ThrottleConfig::default()
        };

        let policy = RetryPolicy::new(retry).with_throttle(Throttle::new(throttle));
        match self.requests_per_window {
            Some(max_requests) => policy.with_pacer(RequestPacer::new(&PacerConfig::new(
                max_requests,
                Duration::from_secs(self.rate_limit_window_secs),
            ))),
            None => policy,
        }
    }

    /// Variables available to path templates
    pub fn template_context(&self) -> TemplateContext {
        TemplateContext::with_config(json!({
            "user_id": self.user_id,
            "api_url": self.api_url,
        }))
    }
}
