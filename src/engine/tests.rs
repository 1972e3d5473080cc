//! Tests for engine module

use super::*;
use crate::http::{
    FixedClock, HttpClientConfig, RecordingSleeper, RetryConfig, Throttle, ThrottleConfig,
};
use crate::streams::tweets;
use crate::types::BackoffType;
use chrono::{TimeZone, Utc};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const NOW: i64 = 1_700_000_000;
const TWEETS_PATH: &str = "/2/users/42/tweets";

fn tweets_page(start: usize, count: usize, next_token: Option<&str>) -> Value {
    let data: Vec<Value> = (start..start + count)
        .map(|i| {
            json!({
                "id": i.to_string(),
                "text": format!("tweet {i}"),
                "created_at": "2024-03-01T12:00:00.000Z"
            })
        })
        .collect();
    let mut meta = json!({"result_count": count});
    if let Some(token) = next_token {
        meta["next_token"] = json!(token);
    }
    json!({"data": data, "meta": meta})
}

/// Always answers with 10 records and a fresh next token
#[derive(Default)]
struct EndlessPages(AtomicUsize);

impl Respond for EndlessPages {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.0.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200).set_body_json(tweets_page(n * 10, 10, Some(&format!("t{n}"))))
    }
}

fn extractor_for(server: &MockServer, sleeper: Arc<RecordingSleeper>) -> Extractor {
    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url(server.uri())
            .bearer_token("test-token")
            .build(),
    )
    .unwrap();
    let retry = RetryPolicy::new(RetryConfig::default().with_max_attempts(3).with_backoff(
        BackoffType::Constant,
        Duration::from_millis(5),
        Duration::from_millis(5),
    ))
    .with_throttle(Throttle::with_clock(
        ThrottleConfig::default(),
        Arc::new(FixedClock(NOW)),
    ))
    .with_sleeper(sleeper);

    Extractor::new(
        Arc::new(client),
        retry,
        tweets(),
        TemplateContext::with_config(json!({"user_id": "42"})),
    )
}

// ============================================================================
// Type Tests
// ============================================================================

#[test]
fn test_record_from_raw() {
    let record = Record::from_raw(
        "tweets",
        json!({"id": "1460323737035677698", "created_at": "2021-11-15T19:08:05.000Z"}),
    );
    assert_eq!(record.stream, "tweets");
    assert_eq!(record.id.as_deref(), Some("1460323737035677698"));
    assert_eq!(
        record.created_at,
        Some(Utc.with_ymd_and_hms(2021, 11, 15, 19, 8, 5).unwrap())
    );
}

#[test]
fn test_record_from_raw_lenient() {
    let record = Record::from_raw("tweets", json!({"id": 7, "created_at": "yesterday"}));
    assert_eq!(record.id.as_deref(), Some("7"));
    assert!(record.created_at.is_none());

    let record = Record::from_raw("tweets", json!({"text": "no id"}));
    assert!(record.id.is_none());
}

#[test]
fn test_normalize_uses_stream_primary_key() {
    let stream = StreamDefinition {
        primary_key: "tweet_id".to_string(),
        ..tweets()
    };
    let record = (stream.post_process)(&stream, json!({"tweet_id": "7", "id": "other"})).unwrap();
    assert_eq!(record.id.as_deref(), Some("7"));
    assert_eq!(record.stream, "tweets");

    let record = (stream.post_process)(&stream, json!({"id": "8"})).unwrap();
    assert!(record.id.is_none());
}

#[test]
fn test_message_serialization() {
    let msg = Message::http_request("tweets", "/2/users/{user_id}/tweets");
    assert!(msg.is_metric());
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        json!({
            "type": "METRIC",
            "metric": "http_requests",
            "stream": "tweets",
            "path": "/2/users/{user_id}/tweets",
            "count": 1
        })
    );

    let msg = Message::record(Record::from_raw("tweets", json!({"id": "1"})));
    assert!(msg.is_record());
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value["type"], "RECORD");
    assert_eq!(value["id"], "1");
    assert_eq!(value["raw"], json!({"id": "1"}));
}

#[test]
fn test_page_outcome_cost() {
    let extractor = tweets().record_extractor();

    let outcome = PageOutcome::from_body(&extractor, &tweets_page(0, 4, Some("x"))).unwrap();
    assert_eq!(outcome.records.len(), 4);
    assert_eq!(
        outcome.cost,
        SyncCost {
            result_count: 4,
            pages: 1
        }
    );

    let outcome = PageOutcome::from_body(&extractor, &json!({})).unwrap();
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.cost.result_count, 0);
}

// ============================================================================
// MetricsCollector Tests
// ============================================================================

#[test]
fn test_metrics_collector_aggregates() {
    let mut metrics = MetricsCollector::new();
    metrics.observe(&Message::http_request("tweets", "/p"));
    metrics.observe(&Message::http_request("tweets", "/p"));
    metrics.observe(&Message::sync_cost(
        "tweets",
        SyncCost {
            result_count: 100,
            pages: 1,
        },
    ));
    metrics.observe(&Message::record(Record::from_raw("tweets", json!({}))));

    let stream = metrics.stream("tweets").unwrap();
    assert_eq!(stream.total_requests(), 2);
    assert_eq!(stream.http_requests.get("/p"), Some(&2));
    assert_eq!(stream.result_count, 100);
    assert_eq!(stream.pages, 1);
    assert_eq!(stream.records, 1);
    assert!(metrics.stream("likes").is_none());
}

#[test]
fn test_metrics_collector_merge() {
    let mut a = MetricsCollector::new();
    a.observe(&Message::http_request("tweets", "/p"));
    let mut b = MetricsCollector::new();
    b.observe(&Message::http_request("tweets", "/p"));
    b.observe(&Message::http_request("mentions", "/m"));

    a.merge(&b);

    assert_eq!(a.total_requests(), 3);
    assert_eq!(a.stream("tweets").unwrap().total_requests(), 2);
    assert_eq!(a.streams().len(), 2);
}

// ============================================================================
// Extraction Loop Tests
// ============================================================================

#[tokio::test]
async fn test_two_pages_until_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TWEETS_PATH))
        .and(query_param_is_missing("pagination_token"))
        .and(query_param("max_results", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweets_page(0, 100, Some("c1"))))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TWEETS_PATH))
        .and(query_param("pagination_token", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweets_page(100, 50, None)))
        .expect(1)
        .mount(&server)
        .await;

    let extractor = extractor_for(&server, Arc::new(RecordingSleeper::new()));
    let extraction = extractor.collect(2).await.unwrap();

    assert_eq!(extraction.records.len(), 150);
    assert_eq!(extraction.records[0].id.as_deref(), Some("0"));
    assert_eq!(extraction.records[149].id.as_deref(), Some("149"));
    assert_eq!(extraction.pages, 2);
    assert_eq!(extraction.stop_reason, Some(StopReason::Exhausted));

    let tweets = extraction.metrics.stream("tweets").unwrap();
    assert_eq!(tweets.total_requests(), 2);
    assert_eq!(
        tweets.http_requests.get("/2/users/{user_id}/tweets"),
        Some(&2)
    );
    assert_eq!(tweets.result_count, 150);
    assert_eq!(tweets.records, 150);
}

#[tokio::test]
async fn test_page_cap_limits_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TWEETS_PATH))
        .respond_with(EndlessPages::default())
        .mount(&server)
        .await;

    let extractor = extractor_for(&server, Arc::new(RecordingSleeper::new()));
    let extraction = extractor.collect(3).await.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(extraction.records.len(), 30);
    assert_eq!(extraction.pages, 3);
    assert_eq!(extraction.stop_reason, Some(StopReason::PageLimit));
}

#[tokio::test]
async fn test_zero_pages_requests_nothing() {
    let server = MockServer::start().await;
    let extractor = extractor_for(&server, Arc::new(RecordingSleeper::new()));

    let extraction = extractor.collect(0).await.unwrap();

    assert!(extraction.records.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_page_stops_despite_next_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TWEETS_PATH))
        .and(query_param_is_missing("pagination_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweets_page(0, 5, Some("c1"))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("pagination_token", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweets_page(5, 5, Some("c2"))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("pagination_token", "c2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"meta": {"result_count": 0, "next_token": "c3"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("pagination_token", "c3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweets_page(10, 5, None)))
        .expect(0)
        .mount(&server)
        .await;

    let extractor = extractor_for(&server, Arc::new(RecordingSleeper::new()));
    let extraction = extractor.collect(15).await.unwrap();

    assert_eq!(extraction.records.len(), 10);
    assert_eq!(extraction.pages, 2);
    assert_eq!(extraction.stop_reason, Some(StopReason::EmptyPage));
    // the empty page still counts as a request
    assert_eq!(extraction.metrics.total_requests(), 3);
}

#[tokio::test]
async fn test_rate_limited_page_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TWEETS_PATH))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-rate-limit-remaining", "0")
                .insert_header("x-rate-limit-reset", (NOW + 30).to_string().as_str()),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TWEETS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweets_page(0, 3, None)))
        .mount(&server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let extractor = extractor_for(&server, sleeper.clone());
    let extraction = extractor.collect(15).await.unwrap();

    assert_eq!(extraction.records.len(), 3);
    assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(90)]);
    // retries are not pages
    assert_eq!(extraction.metrics.total_requests(), 1);
}

#[tokio::test]
async fn test_fatal_status_aborts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TWEETS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let extractor = extractor_for(&server, Arc::new(RecordingSleeper::new()));
    let err = extractor.collect(15).await.unwrap_err();

    assert!(matches!(err, Error::Fatal { status: 401, .. }));
}

#[tokio::test]
async fn test_stream_yields_error_last() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param_is_missing("pagination_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweets_page(0, 2, Some("c1"))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("pagination_token", "c1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let extractor = extractor_for(&server, Arc::new(RecordingSleeper::new()));
    let items: Vec<Result<Message>> = extractor.extract(15).collect().await;

    let records = items
        .iter()
        .filter(|item| matches!(item, Ok(Message::Record(_))))
        .count();
    assert_eq!(records, 2);
    assert!(matches!(
        items.last(),
        Some(Err(Error::Fatal { status: 403, .. }))
    ));
}

#[tokio::test]
async fn test_stream_is_lazy() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param_is_missing("pagination_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweets_page(0, 2, Some("c1"))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("pagination_token", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweets_page(2, 2, None)))
        .mount(&server)
        .await;

    let extractor = extractor_for(&server, Arc::new(RecordingSleeper::new()));
    let mut stream = extractor.extract(15);
    assert!(server.received_requests().await.unwrap().is_empty());

    // first page: two metrics then the first record
    for _ in 0..3 {
        stream.next().await.unwrap().unwrap();
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    drop(stream);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_repeated_token_is_a_loop() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TWEETS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweets_page(0, 1, Some("same"))))
        .mount(&server)
        .await;

    let extractor = extractor_for(&server, Arc::new(RecordingSleeper::new()));
    let mut pages = extractor.pages(15);

    assert_eq!(pages.next_page().await.unwrap().unwrap().len(), 3);
    assert_eq!(pages.paginator().current_value(), Some("same"));
    // the second page repeats the token; its records arrive before the error
    assert_eq!(pages.next_page().await.unwrap().unwrap().len(), 3);
    assert!(matches!(
        pages.next_page().await,
        Err(Error::PaginationLoop { .. })
    ));
    assert!(pages.next_page().await.unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TWEETS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let extractor = extractor_for(&server, Arc::new(RecordingSleeper::new()));
    let err = extractor.collect(1).await.unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
}
