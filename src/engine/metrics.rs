//! Metrics aggregation
//!
//! A collector is owned by whoever drives the extraction. Several collectors
//! can be merged, e.g. one per concurrent extraction.

use super::types::{Message, Metric};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Totals for one stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamMetrics {
    /// Page requests keyed by path template
    pub http_requests: BTreeMap<String, u64>,
    /// Sum of `meta.result_count`
    pub result_count: u64,
    /// Pages fetched
    pub pages: u64,
    /// Records emitted
    pub records: u64,
}

impl StreamMetrics {
    /// Page requests over all paths
    pub fn total_requests(&self) -> u64 {
        self.http_requests.values().sum()
    }
}

/// Aggregates metric points by stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsCollector {
    streams: BTreeMap<String, StreamMetrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one metric point in
    pub fn record(&mut self, metric: &Metric) {
        match metric {
            Metric::HttpRequests {
                stream,
                path,
                count,
            } => {
                *self
                    .entry(stream)
                    .http_requests
                    .entry(path.clone())
                    .or_default() += count;
            }
            Metric::SyncCost {
                stream,
                result_count,
                pages,
            } => {
                let entry = self.entry(stream);
                entry.result_count += result_count;
                entry.pages += pages;
            }
        }
    }

    /// Fold any message in; records are counted per stream
    pub fn observe(&mut self, message: &Message) {
        match message {
            Message::Metric(metric) => self.record(metric),
            Message::Record(record) => self.entry(&record.stream).records += 1,
        }
    }

    /// Add another collector's totals to this one
    pub fn merge(&mut self, other: &Self) {
        for (name, theirs) in &other.streams {
            let ours = self.entry(name);
            for (path, count) in &theirs.http_requests {
                *ours.http_requests.entry(path.clone()).or_default() += count;
            }
            ours.result_count += theirs.result_count;
            ours.pages += theirs.pages;
            ours.records += theirs.records;
        }
    }

    /// Totals for one stream
    pub fn stream(&self, name: &str) -> Option<&StreamMetrics> {
        self.streams.get(name)
    }

    /// All streams seen so far
    pub fn streams(&self) -> &BTreeMap<String, StreamMetrics> {
        &self.streams
    }

    /// Page requests over all streams
    pub fn total_requests(&self) -> u64 {
        self.streams.values().map(StreamMetrics::total_requests).sum()
    }

    /// Records over all streams
    pub fn total_records(&self) -> u64 {
        self.streams.values().map(|s| s.records).sum()
    }

    /// Log one summary line per stream
    pub fn log_summary(&self) {
        for (name, m) in &self.streams {
            info!(
                stream = %name,
                requests = m.total_requests(),
                pages = m.pages,
                result_count = m.result_count,
                records = m.records,
                "Stream metrics"
            );
        }
    }

    fn entry(&mut self, stream: &str) -> &mut StreamMetrics {
        self.streams.entry(stream.to_string()).or_default()
    }
}
