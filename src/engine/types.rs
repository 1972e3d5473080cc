//! Engine types
//!
//! Records, metrics and the messages an extraction emits.

use crate::decode::{extract_path_value, RecordExtractor};
use crate::error::Result;
use crate::streams::StreamDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A normalized record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stream the record belongs to
    pub stream: String,
    /// Primary key, when the raw record carries one
    pub id: Option<String>,
    /// The record as returned by the API
    pub raw: Value,
    /// Creation time parsed from `created_at`
    pub created_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Build a record from a raw API object keyed by `id`
    pub fn from_raw(stream: impl Into<String>, raw: Value) -> Self {
        Self::keyed(stream, "id", raw)
    }

    /// Build a record whose primary key lives in `primary_key`
    pub fn keyed(stream: impl Into<String>, primary_key: &str, raw: Value) -> Self {
        let id = match raw.get(primary_key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let created_at = raw
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Self {
            stream: stream.into(),
            id,
            raw,
            created_at,
        }
    }

    /// Default post-processing: keep every record
    pub fn normalize(stream: &StreamDefinition, raw: Value) -> Option<Self> {
        Some(Self::keyed(stream.name.as_str(), &stream.primary_key, raw))
    }
}

/// A metric point, emitted once per page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum Metric {
    /// One page request (retries inside the page are not counted)
    HttpRequests {
        /// Stream name
        stream: String,
        /// Unrendered path template
        path: String,
        /// Always 1 per page
        count: u64,
    },
    /// Result count reported by the API for one page
    SyncCost {
        /// Stream name
        stream: String,
        /// `meta.result_count`, 0 when absent
        result_count: u64,
        /// Always 1 per page
        pages: u64,
    },
}

/// A message emitted during extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// A normalized record
    Record(Record),
    /// A metric point
    Metric(Metric),
}

impl Message {
    /// Create a record message
    pub fn record(record: Record) -> Self {
        Self::Record(record)
    }

    /// Create an HTTP request counter message
    pub fn http_request(stream: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Metric(Metric::HttpRequests {
            stream: stream.into(),
            path: path.into(),
            count: 1,
        })
    }

    /// Create a sync cost message
    pub fn sync_cost(stream: impl Into<String>, cost: SyncCost) -> Self {
        Self::Metric(Metric::SyncCost {
            stream: stream.into(),
            result_count: cost.result_count,
            pages: cost.pages,
        })
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    /// Check if this is a metric message
    pub fn is_metric(&self) -> bool {
        matches!(self, Self::Metric(_))
    }
}

/// Cost of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncCost {
    pub result_count: u64,
    pub pages: u64,
}

/// Records and cost of one successful page
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub records: Vec<Value>,
    pub cost: SyncCost,
}

impl PageOutcome {
    /// Extract records and cost from a parsed page body
    pub fn from_body(extractor: &RecordExtractor, body: &Value) -> Result<Self> {
        let records = extractor.extract(body)?;
        let result_count = extract_path_value(body, "meta.result_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        Ok(Self {
            records,
            cost: SyncCost {
                result_count,
                pages: 1,
            },
        })
    }
}

/// Why an extraction ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The last response carried no next token
    Exhausted,
    /// `max_pages` pages were fetched
    PageLimit,
    /// A page came back without records
    EmptyPage,
}
