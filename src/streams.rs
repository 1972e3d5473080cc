//! Stream definitions
//!
//! A stream is a configuration value, not a type: the path template, where
//! the records and the cursor live in the body, the field selection, and a
//! post-processing function. One generic extraction loop serves them all.

use crate::decode::RecordExtractor;
use crate::engine::Record;
use crate::error::{Error, Result};
use crate::http::RequestDescriptor;
use crate::template::{self, TemplateContext};
use serde_json::Value;
use std::sync::LazyLock;

/// Normalizes one raw record of the given stream; `None` drops it
pub type PostProcess = fn(&StreamDefinition, Value) -> Option<Record>;

/// Fields requested for every tweet
pub const TWEET_FIELDS: &[&str] = &[
    "id",
    "text",
    "attachments",
    "author_id",
    "context_annotations",
    "conversation_id",
    "created_at",
    "entities",
    "geo",
    "in_reply_to_user_id",
    "lang",
    "possibly_sensitive",
    "public_metrics",
    "referenced_tweets",
    "reply_settings",
    "source",
    "withheld",
];

/// Built-in stream definitions
pub static BUILTIN_STREAMS: LazyLock<Vec<StreamDefinition>> = LazyLock::new(|| vec![tweets()]);

/// Everything the extraction loop needs to know about one endpoint
#[derive(Debug, Clone)]
pub struct StreamDefinition {
    /// Stream name, used to tag records and metrics
    pub name: String,
    /// Path template, e.g. `/2/users/{user_id}/tweets`
    pub path: String,
    /// Record path inside the body
    pub records_path: String,
    /// Query parameter carrying the cursor
    pub cursor_param: String,
    /// Dotted path to the next cursor in the body
    pub cursor_path: String,
    /// Query parameter carrying the page size
    pub page_size_param: String,
    /// Records requested per page
    pub page_size: u32,
    /// Query parameter carrying the field selection
    pub fields_param: String,
    /// Fields requested, comma-joined on the wire
    pub fields: Vec<String>,
    /// Primary key of the records
    pub primary_key: String,
    /// Record normalization
    pub post_process: PostProcess,
}

impl StreamDefinition {
    /// Render the path and build the request for one page
    pub fn build_request(
        &self,
        context: &TemplateContext,
        cursor: Option<&str>,
    ) -> Result<RequestDescriptor> {
        let path = template::render(&self.path, context)?;
        let mut builder = RequestDescriptor::builder(path);

        if let Some(cursor) = cursor {
            builder = builder.query(&self.cursor_param, cursor);
        }
        builder = builder.query(&self.page_size_param, self.page_size.to_string());
        if !self.fields.is_empty() {
            builder = builder.query(&self.fields_param, self.fields.join(","));
        }

        Ok(builder.build())
    }

    /// Record extractor for this stream's record path
    pub fn record_extractor(&self) -> RecordExtractor {
        RecordExtractor::new(&self.records_path)
    }
}

/// `GET /2/users/{user_id}/tweets`: a user's most recent posts
pub fn tweets() -> StreamDefinition {
    StreamDefinition {
        name: "tweets".to_string(),
        path: "/2/users/{user_id}/tweets".to_string(),
        records_path: "$.data[*]".to_string(),
        cursor_param: "pagination_token".to_string(),
        cursor_path: "meta.next_token".to_string(),
        page_size_param: "max_results".to_string(),
        page_size: 100,
        fields_param: "tweet.fields".to_string(),
        fields: TWEET_FIELDS.iter().map(|f| (*f).to_string()).collect(),
        primary_key: "id".to_string(),
        post_process: Record::normalize,
    }
}

/// Names of all built-in streams
pub fn list_streams() -> Vec<&'static str> {
    BUILTIN_STREAMS.iter().map(|s| s.name.as_str()).collect()
}

/// Look up a built-in stream by name
pub fn find_stream(name: &str) -> Result<StreamDefinition> {
    BUILTIN_STREAMS
        .iter()
        .find(|s| s.name == name)
        .cloned()
        .ok_or_else(|| Error::StreamNotFound {
            stream: name.to_string(),
        })
}
