//! Extraction engine
//!
//! Drives one stream through its pages: build the request, fetch it through
//! the retry policy, parse the body once, emit records and metrics, advance
//! the cursor.
//!
//! # Overview
//!
//! - `Extractor` - binds a client, a retry policy and a stream definition
//! - `PageLoop` - the per-extraction state, one page per call
//! - `Extractor::extract` - the same loop as a lazy `futures::Stream`
//! - `MetricsCollector` - caller-owned aggregation of metric messages

mod metrics;
mod types;

pub use metrics::{MetricsCollector, StreamMetrics};
pub use types::{Message, Metric, PageOutcome, Record, StopReason, SyncCost};

use crate::error::{Error, Result};
use crate::http::{HttpClient, RetryPolicy};
use crate::pagination::CursorPaginator;
use crate::streams::StreamDefinition;
use crate::template::TemplateContext;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Lazy, finite stream of extraction messages
pub type MessageStream<'a> = BoxStream<'a, Result<Message>>;

/// Everything collected by [`Extractor::collect`]
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Records in emission order
    pub records: Vec<Record>,
    /// Aggregated metrics
    pub metrics: MetricsCollector,
    /// Pages that produced records
    pub pages: u32,
    /// Why the loop ended
    pub stop_reason: Option<StopReason>,
}

/// Extracts one stream
#[derive(Clone)]
pub struct Extractor {
    client: Arc<HttpClient>,
    retry: RetryPolicy,
    stream: StreamDefinition,
    context: TemplateContext,
}

impl Extractor {
    /// Create an extractor; `context` supplies the path variables
    pub fn new(
        client: Arc<HttpClient>,
        retry: RetryPolicy,
        stream: StreamDefinition,
        context: TemplateContext,
    ) -> Self {
        Self {
            client,
            retry,
            stream,
            context,
        }
    }

    /// The stream being extracted
    pub fn stream(&self) -> &StreamDefinition {
        &self.stream
    }

    /// Start a fresh page loop
    pub fn pages(&self, max_pages: u32) -> PageLoop<'_> {
        PageLoop::new(self, max_pages)
    }

    /// Lazily extract up to `max_pages` pages.
    ///
    /// Nothing is requested until the stream is polled. A terminal error is
    /// the last item; the stream ends after it.
    pub fn extract(&self, max_pages: u32) -> MessageStream<'_> {
        stream::try_unfold(self.pages(max_pages), |mut pages| async move {
            let batch = pages.next_page().await?;
            Ok::<_, Error>(batch.map(|messages| (messages, pages)))
        })
        .map_ok(|messages| stream::iter(messages.into_iter().map(Ok::<Message, Error>)))
        .try_flatten()
        .boxed()
    }

    /// Drain an extraction into memory
    pub async fn collect(&self, max_pages: u32) -> Result<Extraction> {
        let start = Instant::now();
        let mut pages = self.pages(max_pages);
        let mut extraction = Extraction::default();

        while let Some(messages) = pages.next_page().await? {
            for message in messages {
                extraction.metrics.observe(&message);
                if let Message::Record(record) = message {
                    extraction.records.push(record);
                }
            }
        }

        extraction.pages = pages.pages_done();
        extraction.stop_reason = pages.stop_reason();

        info!(
            "Extracted {} records from '{}' in {} pages ({}ms)",
            extraction.records.len(),
            self.stream.name,
            extraction.pages,
            start.elapsed().as_millis()
        );

        Ok(extraction)
    }
}

/// State of one extraction: the paginator and the page count.
///
/// Page N+1 is never requested before page N has been classified and its
/// cursor derived.
pub struct PageLoop<'a> {
    extractor: &'a Extractor,
    paginator: CursorPaginator,
    max_pages: u32,
    pages_done: u32,
    stop_reason: Option<StopReason>,
    pending: Option<Error>,
    failed: bool,
}

impl<'a> PageLoop<'a> {
    fn new(extractor: &'a Extractor, max_pages: u32) -> Self {
        Self {
            extractor,
            paginator: CursorPaginator::new(&extractor.stream.cursor_path),
            max_pages,
            pages_done: 0,
            stop_reason: None,
            pending: None,
            failed: false,
        }
    }

    /// Pages that produced records so far
    pub fn pages_done(&self) -> u32 {
        self.pages_done
    }

    /// Set once the loop has ended normally
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn paginator(&self) -> &CursorPaginator {
        &self.paginator
    }

    /// Fetch and process the next page.
    ///
    /// Returns the page's messages (metrics first, then records), or `None`
    /// once the loop has ended. After an error the loop stays ended.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Message>>> {
        if self.failed {
            return Ok(None);
        }
        let result = self.step().await;
        self.failed = result.is_err();
        result
    }

    async fn step(&mut self) -> Result<Option<Vec<Message>>> {
        if let Some(err) = self.pending.take() {
            return Err(err);
        }
        if self.stop_reason.is_some() {
            return Ok(None);
        }
        if self.paginator.finished() {
            self.stop_reason = Some(StopReason::Exhausted);
            return Ok(None);
        }
        if self.pages_done >= self.max_pages {
            debug!("Page limit of {} reached", self.max_pages);
            self.stop_reason = Some(StopReason::PageLimit);
            return Ok(None);
        }

        let extractor = self.extractor;
        let stream = &extractor.stream;

        let request = stream.build_request(&extractor.context, self.paginator.current_value())?;
        let response = extractor
            .retry
            .execute_with_retry(&extractor.client, &request)
            .await?;
        let body = response.json()?;
        let outcome = PageOutcome::from_body(&stream.record_extractor(), &body)?;

        let mut messages = vec![
            Message::http_request(&stream.name, &stream.path),
            Message::sync_cost(&stream.name, outcome.cost),
        ];

        // An empty page ends the extraction even when a next token is present,
        // so a transient empty page truncates the result.
        if outcome.records.is_empty() {
            info!(
                "Pagination stopped after {} pages because no records were found in the last response",
                self.pages_done
            );
            self.stop_reason = Some(StopReason::EmptyPage);
            return Ok(Some(messages));
        }

        debug!(
            "Page {}: fetched {} records",
            self.pages_done + 1,
            outcome.records.len()
        );

        messages.extend(
            outcome
                .records
                .into_iter()
                .filter_map(|raw| (stream.post_process)(stream, raw))
                .map(Message::record),
        );
        self.pages_done += 1;

        // Records already fetched are delivered before a cursor error surfaces.
        if let Err(err) = self.paginator.advance(&body) {
            self.pending = Some(err);
        }

        Ok(Some(messages))
    }
}

#[cfg(test)]
mod tests;
