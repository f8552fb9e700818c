//! End-to-end tests for the search HTTP API: a real server on an ephemeral
//! port, a CSV dataset in a temp dir and mocked NASA APIs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::Path;

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use astrobio::config::AppConfig;
use astrobio::server::{AppState, SearchServer};
use astrobio_search::{ApiKind, DatasetFile, DatasetLayout, SearchConfig, SourceConfig};

const ARTICLES: &str = "\
Title,Link,Description
Microgravity Effects on Bone,https://example.org/pmc1,Bone density loss during spaceflight
Plant Growth on the ISS,https://example.org/pmc2,Arabidopsis roots in orbit
";

fn write_articles(dir: &Path) -> DatasetFile {
    let path = dir.join("articles.csv");
    std::fs::write(&path, ARTICLES).unwrap();
    DatasetFile {
        path,
        label: "NASA Articles".into(),
        layout: DatasetLayout::Articles,
    }
}

fn mock_source(server: &MockServer, name: &str, route: &str, api: ApiKind) -> SourceConfig {
    SourceConfig {
        min_request_interval_ms: 0,
        timeout_ms: 2_000,
        ..SourceConfig::new(name, format!("{}{route}?q={{query}}&size={{limit}}", server.uri()), api)
    }
}

fn test_config(datasets: Vec<DatasetFile>, sources: Vec<SourceConfig>) -> AppConfig {
    let mut config = AppConfig {
        sources,
        search: SearchConfig {
            request_jitter_ms: (0, 0),
            ..SearchConfig::default()
        },
        ..AppConfig::default()
    };
    config.server.port = 0;
    config.local.datasets = datasets;
    config
}

async fn start(config: &AppConfig) -> (SearchServer, String) {
    let state = AppState::from_config(config).await.expect("state builds");
    let server = SearchServer::start(state, &config.server).await.expect("server starts");
    let base = format!("http://{}", server.addr());
    (server, base)
}

async fn get_json(url: &str) -> (reqwest::StatusCode, Value) {
    let response = reqwest::get(url).await.expect("request sent");
    let status = response.status();
    (status, response.json().await.expect("json body"))
}

#[tokio::test]
async fn health_reports_service() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(vec![write_articles(dir.path())], vec![]);
    let (_server, base) = start(&config).await;

    let (status, body) = get_json(&format!("{base}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "NASA Space Biology Search API");
    assert!(body["timestamp"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn search_merges_local_and_nasa_results() {
    let nasa = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ntrs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": 42, "title": "Bone remodeling after long-duration flight"}]
        })))
        .expect(1)
        .mount(&nasa)
        .await;
    Mock::given(method("GET"))
        .and(path("/osdr"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&nasa)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(
        vec![write_articles(dir.path())],
        vec![
            mock_source(&nasa, "NASA OSDR", "/osdr", ApiKind::Osdr),
            mock_source(&nasa, "NASA NTRS", "/ntrs", ApiKind::Ntrs),
        ],
    );
    let (_server, base) = start(&config).await;

    let (status, body) = get_json(&format!("{base}/api/search?query=bone&limit=5")).await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 2);
    assert_eq!(body["cached"], false);
    assert_eq!(body["source_counts"]["Local Database"], 1);
    assert_eq!(body["source_counts"]["NASA NTRS"], 1);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["source"], "NASA OSDR");
}

#[tokio::test]
async fn nasa_apis_can_be_excluded() {
    let nasa = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(0)
        .mount(&nasa)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(
        vec![write_articles(dir.path())],
        vec![mock_source(&nasa, "NASA NTRS", "/ntrs", ApiKind::Ntrs)],
    );
    let (_server, base) = start(&config).await;

    let (status, body) = get_json(&format!("{base}/api/search?query=plant&include_nasa_apis=false")).await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["title"], "Plant Growth on the ISS");
}

#[tokio::test]
async fn oversized_limit_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(vec![write_articles(dir.path())], vec![]);
    let (_server, base) = start(&config).await;

    let (status, body) = get_json(&format!("{base}/api/search?query=o&limit=5000")).await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 2);

    let (status, body) = get_json(&format!("{base}/api/search/csv?query=o&limit=0")).await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn local_failure_is_service_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let missing = DatasetFile {
        path: dir.path().join("absent.csv"),
        label: "NASA Articles".into(),
        layout: DatasetLayout::Articles,
    };
    let config = test_config(vec![missing], vec![]);
    let (_server, base) = start(&config).await;

    let (status, body) = get_json(&format!("{base}/api/search?query=bone")).await;
    assert_eq!(status, 503);
    assert_eq!(body["error"]["type"], "service_unavailable");
    assert!(body["error"]["message"].as_str().unwrap().contains("local source failure"));
}

#[tokio::test]
async fn csv_search_and_stats() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(vec![write_articles(dir.path())], vec![]);
    let (_server, base) = start(&config).await;

    let (status, body) = get_json(&format!("{base}/api/search/csv?query=microgravity")).await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["source_name"], "Local Database");
    assert_eq!(body["results"][0]["link"], "https://example.org/pmc1");

    let (status, stats) = get_json(&format!("{base}/api/search/csv/stats")).await;
    assert_eq!(status, 200);
    assert_eq!(stats["loaded"], true);
    assert_eq!(stats["total_records"], 2);
    assert_eq!(stats["datasets"]["NASA Articles"], 2);
}

#[tokio::test]
async fn graph_derivation_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(vec![write_articles(dir.path())], vec![]);
    let (_server, base) = start(&config).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/graph/derive"))
        .json(&json!({
            "tags": ["Human Research", "Technology Development", "ISS Research"],
            "title": "Tempus ALS ISS Technology Demonstration"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let graph: Value = response.json().await.unwrap();
    assert_eq!(graph["central_concept"], "Human Research");
    assert_eq!(graph["connected_nodes"], json!(["Technology Development", "ISS Research"]));
}

#[tokio::test]
async fn api_key_guards_api_routes_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(vec![write_articles(dir.path())], vec![]);
    config.server.api_key = Some("s3cret".into());
    let (_server, base) = start(&config).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}/api/search?query=bone")).send().await.unwrap();
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "authentication_error");

    let response = client
        .get(format!("{base}/api/search?query=bone"))
        .header("x-api-key", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .get(format!("{base}/api/search?query=bone"))
        .header("x-api-key", "s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn cors_allows_configured_dev_origin() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(vec![write_articles(dir.path())], vec![]);
    let (_server, base) = start(&config).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{base}/api/search"))
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "x-api-key")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );

    let response = reqwest::Client::new()
        .get(format!("{base}/health"))
        .header("origin", "http://evil.example")
        .send()
        .await
        .unwrap();
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn nasa_only_search_works_without_local_datasets() {
    let nasa = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ntrs"))
        .and(query_param("q", "bone loss"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": 7, "title": "Bone loss countermeasures"},
                {"id": 8, "title": "Exercise and bone density"}
            ]
        })))
        .expect(1)
        .mount(&nasa)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let missing = DatasetFile {
        path: dir.path().join("absent.csv"),
        label: "NASA Articles".into(),
        layout: DatasetLayout::Articles,
    };
    let config = test_config(
        vec![missing],
        vec![mock_source(&nasa, "NASA NTRS", "/ntrs", ApiKind::Ntrs)],
    );
    let (_server, base) = start(&config).await;

    let (status, body) = get_json(&format!("{base}/api/search/nasa?query=Bone%20%20Loss&limit=5")).await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 2);
    assert_eq!(body["source_counts"]["NASA NTRS"], 2);
    assert_eq!(body["results"][0]["title"], "Bone loss countermeasures");
    assert!(body["errors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn connectivity_check_reports_each_nasa_api() {
    let nasa = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ntrs"))
        .and(query_param("size", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&nasa)
        .await;
    Mock::given(method("GET"))
        .and(path("/osdr"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&nasa)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(
        vec![write_articles(dir.path())],
        vec![
            mock_source(&nasa, "NASA OSDR", "/osdr", ApiKind::Osdr),
            mock_source(&nasa, "NASA NTRS", "/ntrs", ApiKind::Ntrs),
        ],
    );
    let (_server, base) = start(&config).await;

    let (status, body) = get_json(&format!("{base}/api/search/nasa/test")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "completed");
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["source"], "NASA OSDR");
    assert_eq!(sources[0]["status"], "error");
    assert!(sources[0]["message"].as_str().unwrap().contains("502"));
    assert_eq!(sources[1]["source"], "NASA NTRS");
    assert_eq!(sources[1]["status"], "success");
    assert_eq!(sources[1]["message"], "API accessible");
}
