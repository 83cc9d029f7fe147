// tests/metrics.rs
//
// Installs the global Prometheus recorder, so it lives in its own test binary.

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt as _;

use tender_monitor::config::AppConfig;
use tender_monitor::ingest::normalize::{DisclosureNormalizer, Normalizers};
use tender_monitor::ingest::providers::MockDisclosureSource;
use tender_monitor::ingest::query::QueryFilters;
use tender_monitor::ingest::run_once;
use tender_monitor::metrics::Metrics;

#[tokio::test]
async fn ingest_series_are_exposed_on_metrics_route() {
    let metrics = Metrics::init(&AppConfig::default()).expect("recorder");

    let source = MockDisclosureSource::new(30, 10, 1);
    let normalizers = Normalizers::new("https://api.example", DisclosureNormalizer::budgets());
    run_once(&source, &normalizers, None, &QueryFilters::default())
        .await
        .expect("mock never fails");

    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let resp = metrics.router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(
        body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap()
            .to_vec(),
    )
    .unwrap();

    assert!(text.contains("ingest_fetch_total"));
    assert!(text.contains("normalize_accepted_total"));
    assert!(text.contains("ingest_parse_ms"));
    assert!(text.contains("query_cache_ttl_secs"));
}
