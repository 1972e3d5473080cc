// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tap-twitter
//!
//! Extracts a user's recent posts from the X (Twitter) API v2 as a lazy
//! stream of normalized records, with cursor pagination, rate-limit aware
//! retries and per-page metrics.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use std::sync::Arc;
//! use tap_twitter::{streams, Extractor, HttpClient, TapConfig};
//!
//! #[tokio::main]
//! async fn main() -> tap_twitter::Result<()> {
//!     let config = TapConfig::from_file("config.yaml")?;
//!     config.validate()?;
//!
//!     let client = HttpClient::with_config(config.http_client_config())?;
//!     let extractor = Extractor::new(
//!         Arc::new(client),
//!         config.retry_policy(),
//!         streams::tweets(),
//!         config.template_context(),
//!     );
//!
//!     let mut messages = extractor.extract(config.max_pages);
//!     while let Some(message) = messages.next().await {
//!         println!("{:?}", message?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            Extractor::extract(max_pages) → Stream         │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//! ┌────────────┬───────────────┼──────────────┬──────────────┐
//! │  Streams   │     HTTP      │   Paginate   │    Decode    │
//! ├────────────┼───────────────┼──────────────┼──────────────┤
//! │ tweets     │ Classify      │ next_token   │ $.data[*]    │
//! │ templates  │ Retry/Backoff │ loop check   │ result_count │
//! │            │ Throttle      │              │              │
//! └────────────┴───────────────┴──────────────┴──────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP client, response classification, retry and rate limiting
pub mod http;

/// Cursor pagination
pub mod pagination;

/// Record extraction from response bodies
pub mod decode;

/// Template interpolation
pub mod template;

/// Tap configuration
pub mod config;

/// Built-in stream definitions
pub mod streams;

/// Extraction loop and metrics
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::TapConfig;
pub use engine::{Extraction, Extractor, Message, MessageStream, Metric, MetricsCollector, Record};
pub use error::{Error, Result};
pub use http::{HttpClient, RetryPolicy};
pub use streams::StreamDefinition;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
