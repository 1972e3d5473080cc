//! Response classification
//!
//! Maps a response's status code to what the retry policy should do with it.
//! Classification is a pure function of the response metadata.

use super::client::HttpResponse;
use reqwest::StatusCode;

/// Outcome category of a single HTTP attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 1xx/2xx/3xx: hand the response to the caller
    Success,
    /// 429: wait for the quota window, then retry
    RateLimited,
    /// 5xx: back off and retry
    Retriable,
    /// 4xx except 429: never retried
    Fatal,
}

/// Classify a bare status code
pub fn classify_status(status: u16) -> ResponseClass {
    match status {
        500.. => ResponseClass::Retriable,
        429 => ResponseClass::RateLimited,
        400..=499 => ResponseClass::Fatal,
        _ => ResponseClass::Success,
    }
}

/// A classified response, carrying the response for whoever acts on it
#[derive(Debug, Clone)]
pub enum Classification {
    /// Usable response
    Success(HttpResponse),
    /// Quota exhausted; the throttle reads the headers
    RateLimited(HttpResponse),
    /// Transient server failure, with a human-readable reason
    Retriable(HttpResponse, String),
    /// Client error, with a human-readable reason
    Fatal(HttpResponse, String),
}

impl Classification {
    /// The category of this classification
    pub fn class(&self) -> ResponseClass {
        match self {
            Self::Success(_) => ResponseClass::Success,
            Self::RateLimited(_) => ResponseClass::RateLimited,
            Self::Retriable(..) => ResponseClass::Retriable,
            Self::Fatal(..) => ResponseClass::Fatal,
        }
    }

    /// The classified response
    pub fn response(&self) -> &HttpResponse {
        match self {
            Self::Success(r) | Self::RateLimited(r) | Self::Retriable(r, _) | Self::Fatal(r, _) => r,
        }
    }

    /// Consume the classification, returning the response
    pub fn into_response(self) -> HttpResponse {
        match self {
            Self::Success(r) | Self::RateLimited(r) | Self::Retriable(r, _) | Self::Fatal(r, _) => r,
        }
    }
}

/// Classify a response
pub fn classify(response: HttpResponse) -> Classification {
    match classify_status(response.status()) {
        ResponseClass::Success => Classification::Success(response),
        ResponseClass::RateLimited => Classification::RateLimited(response),
        ResponseClass::Retriable => {
            let reason = error_message(&response);
            Classification::Retriable(response, reason)
        }
        ResponseClass::Fatal => {
            let reason = error_message(&response);
            Classification::Fatal(response, reason)
        }
    }
}

/// Describe an error response, e.g. `404 Client Error: Not Found for path: /2/users/1/tweets`
pub(crate) fn error_message(response: &HttpResponse) -> String {
    let status = response.status();
    let kind = if status >= 500 { "Server" } else { "Client" };
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");

    format!(
        "{status} {kind} Error: {reason} for path: {}",
        response.path()
    )
}
