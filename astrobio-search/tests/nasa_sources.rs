//! HTTP contract tests for the NASA API sources against a mock server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use astrobio_search::config::SourceConfig;
use astrobio_search::sources::nasa::shape_for;
use astrobio_search::{
    build_aggregator, normalize, ApiKind, CsvSource, DatasetLayout, NasaApiSource, SearchConfig,
    Source, SourceError, SourceKind,
};

fn source_config(server: &MockServer, name: &str, route: &str, api: ApiKind) -> SourceConfig {
    SourceConfig {
        min_request_interval_ms: 0,
        timeout_ms: 2_000,
        ..SourceConfig::new(
            name,
            format!("{}{route}?q={{query}}&size={{limit}}", server.uri()),
            api,
        )
    }
}

fn source(config: SourceConfig) -> NasaApiSource {
    NasaApiSource::new(config, reqwest::Client::new(), (0, 0))
}

#[tokio::test]
async fn ntrs_results_fetched_and_query_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("q", "bone loss"))
        .and(query_param("size", "5"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": 20230001, "title": "Bone loss in spaceflight", "abstract": "Findings", "authors": ["A. Smith"]},
                {"id": 20230002, "title": "Bone density recovery"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ntrs = source(source_config(&server, "NASA NTRS", "/api/search", ApiKind::Ntrs));
    let records = ntrs.fetch("bone loss", 5).await.expect("fetch succeeds");
    assert_eq!(records.len(), 2);

    let result = normalize::normalize(&records[0], ntrs.shape(), ntrs.context(), 0).expect("normalizes");
    assert_eq!(result.id, "nasa-ntrs:20230001");
    assert_eq!(result.link, "https://ntrs.nasa.gov/citations/20230001");
    assert_eq!(result.authors, vec!["A. Smith"]);
}

#[tokio::test]
async fn limit_capped_to_api_page_size() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bio/repo/search"))
        .and(query_param("size", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"studies": []})))
        .expect(1)
        .mount(&server)
        .await;

    let osdr = source(source_config(&server, "NASA OSDR", "/bio/repo/search", ApiKind::Osdr));
    let records = osdr.fetch("mice", 500).await.expect("fetch succeeds");
    assert!(records.is_empty());
}

#[tokio::test]
async fn non_success_status_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let nslsl = source(source_config(&server, "NASA NSLSL", "/nslsl/api/search", ApiKind::Nslsl));
    let err = nslsl.fetch("radiation", 10).await.unwrap_err();
    match err {
        SourceError::Unavailable(message) => assert!(message.contains("503")),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_json_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let open_data = source(source_config(&server, "NASA Open Data Portal", "/api/3/action/package_search", ApiKind::OpenData));
    let err = open_data.fetch("plants", 10).await.unwrap_err();
    assert!(matches!(err, SourceError::MalformedResponse(_)));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"results": []}))
                .set_delay(Duration::from_millis(1_500)),
        )
        .mount(&server)
        .await;

    let config = SourceConfig {
        timeout_ms: 100,
        ..source_config(&server, "NASA NTRS", "/api/search", ApiKind::Ntrs)
    };
    let err = source(config).fetch("bone", 10).await.unwrap_err();
    assert!(matches!(err, SourceError::Timeout(_)));
}

#[tokio::test]
async fn courtesy_delay_spaces_requests_to_one_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(2)
        .mount(&server)
        .await;

    let config = SourceConfig {
        min_request_interval_ms: 200,
        ..source_config(&server, "NASA NTRS", "/api/search", ApiKind::Ntrs)
    };
    let ntrs = source(config);
    let started = std::time::Instant::now();
    ntrs.fetch("bone", 10).await.expect("first fetch");
    ntrs.fetch("bone", 10).await.expect("second fetch");
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn aggregator_merges_live_sources_and_isolates_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ntrs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": 1, "title": "Microgravity effects on bone"}, {"id": 2, "title": "Muscle atrophy in flight"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/osdr"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let local = CsvSource::from_csv_str(
        "Title,Link,Description\nMicrogravity Effects on Bone,https://example.org/pmc1,Bone study\n",
        "NASA Articles",
        DatasetLayout::Articles,
        1_000,
    );
    let sources = vec![
        SourceConfig {
            base_score: Some(0.8),
            ..source_config(&server, "NASA OSDR", "/osdr", ApiKind::Osdr)
        },
        SourceConfig {
            base_score: Some(0.85),
            ..source_config(&server, "NASA NTRS", "/ntrs", ApiKind::Ntrs)
        },
    ];
    let search = SearchConfig {
        request_jitter_ms: (0, 0),
        ..SearchConfig::default()
    };
    let aggregator = build_aggregator(&search, &sources, Arc::new(local)).expect("builds");

    let response = aggregator.search("bone", 10, true).await.expect("search succeeds");
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].source, "NASA OSDR");
    assert_eq!(response.count, 2);
    // NTRS prior 0.85 outranks the boosted local default (0.5 + 0.2).
    assert_eq!(response.results[0].title, "Muscle atrophy in flight");
    assert_eq!(response.results[1].source_kind, SourceKind::Local);
    assert_eq!(response.results[1].title, "Microgravity Effects on Bone");
    assert_eq!(response.source_counts.get("NASA NTRS"), Some(&1));
}

#[test]
fn every_api_has_a_shape() {
    for api in [ApiKind::Osdr, ApiKind::OpenData, ApiKind::Ntrs, ApiKind::Nslsl] {
        assert!(!shape_for(api).title.is_empty());
    }
}
