// tests/metrics.rs
use async_trait::async_trait;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use feed_sentinel::config::scrape_rules::ScrapeRules;
use feed_sentinel::config::RunSettings;
use feed_sentinel::ingest::fetcher::{ContentFetcher, FetchError};
use feed_sentinel::ingest::types::{Source, SourceKind};
use feed_sentinel::metrics::Metrics;
use feed_sentinel::notify::{SendOutcome, Transport};
use feed_sentinel::store::memory::MemoryStore;
use feed_sentinel::Pipeline;

struct Unreachable;

#[async_trait]
impl ContentFetcher for Unreachable {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        Err(FetchError::Status(503))
    }
}

struct Sink;

#[async_trait]
impl Transport for Sink {
    async fn send(&self, _text: &str) -> SendOutcome {
        SendOutcome::Sent
    }
    fn max_len(&self) -> usize {
        2000
    }
    fn name(&self) -> &'static str {
        "sink"
    }
}

// One recorder per process, so everything lives in a single test.
#[tokio::test]
async fn metrics_endpoint_exposes_run_series() {
    let metrics = Metrics::init().expect("install recorder");

    let store = MemoryStore::with_sources(&[Source {
        id: 1,
        name: "Down".into(),
        kind: SourceKind::Feed,
        url: "https://down.test/rss".into(),
        enabled: true,
    }]);
    let pipeline = Pipeline::new(
        Arc::new(store),
        Arc::new(Unreachable),
        Arc::new(Sink),
        ScrapeRules::default(),
        RunSettings::default(),
    );
    let summary = pipeline.run_at(0).await;
    assert_eq!(summary.skipped.len(), 1);

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "sentinel_runs_total",
        "sentinel_sources_polled_total",
        "sentinel_last_run_ts",
    ] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }
}
