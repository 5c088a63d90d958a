//! Integration tests for `OpenDataClient`, `fetch_all` and `DatasetCache`
//! against a local HTTP server.
//!
//! Uses `wiremock` so no real network traffic is made. Each test mounts the
//! pages it needs, keyed on the `offset` query parameter.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ratp_opendata::{
    fetch_all, normalize, CacheSettings, DatasetCache, Freshness, OpenDataClient, OpenDataError,
};

const RECORDS_PATH: &str = "/api/explore/v2.1/catalog/datasets/commerces/records";

fn test_client(server: &MockServer) -> OpenDataClient {
    OpenDataClient::new(
        &format!("{}{RECORDS_PATH}", server.uri()),
        5,
        "ratp-test/0.1",
    )
    .expect("failed to build test OpenDataClient")
}

/// `count` shop records numbered from `first`.
fn shops(first: usize, count: usize) -> Vec<serde_json::Value> {
    (first..first + count)
        .map(|i| {
            json!({
                "tco_libelle": if i % 3 == 0 { "Presse" } else { "Boulangerie" },
                "dea_nom_commerce": format!("Commerce {i}"),
                "dea_commune_livraison": if i % 2 == 0 { "Paris" } else { "Vincennes" },
                "geocodage_ban": {"lat": 48.85, "lon": 2.35}
            })
        })
        .collect()
}

async fn mount_page(server: &MockServer, offset: usize, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(RECORDS_PATH))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(server)
        .await;
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .len()
}

// ---------------------------------------------------------------------------
// single page
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_page_sends_limit_and_offset() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(RECORDS_PATH))
        .and(query_param("limit", "100"))
        .and(query_param("offset", "200"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&json!({"total_count": 201, "results": shops(200, 1)})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = test_client(&server).fetch_page(200, 100).await.unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.total_count, Some(201));
    assert_eq!(page.records[0]["dea_nom_commerce"], "Commerce 200");
}

#[tokio::test]
async fn fetch_page_accepts_bare_array() {
    let server = MockServer::start().await;
    mount_page(&server, 0, json!(shops(0, 2))).await;

    let page = test_client(&server).fetch_page(0, 100).await.unwrap();
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.total_count, None);
}

#[tokio::test]
async fn fetch_page_maps_non_2xx_to_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RECORDS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = test_client(&server).fetch_page(0, 100).await.unwrap_err();
    match err {
        OpenDataError::UnexpectedStatus { status, ref url } => {
            assert_eq!(status, 500);
            assert!(url.contains("offset=0"), "url should carry offset: {url}");
        }
        other => panic!("expected OpenDataError::UnexpectedStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_page_maps_bad_json_to_deserialize() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RECORDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server).fetch_page(0, 100).await.unwrap_err();
    assert!(err.is_parse(), "expected parse error, got: {err:?}");
}

// ---------------------------------------------------------------------------
// pagination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_all_250_records_takes_three_requests() {
    let server = MockServer::start().await;
    mount_page(&server, 0, json!(shops(0, 100))).await;
    mount_page(&server, 100, json!(shops(100, 100))).await;
    mount_page(&server, 200, json!(shops(200, 50))).await;

    let client = test_client(&server);
    let outcome = fetch_all(&client, 100, 50).await;

    assert!(outcome.is_complete(), "unexpected error: {:?}", outcome.error);
    assert_eq!(outcome.records.len(), 250);
    assert_eq!(request_count(&server).await, 3);
    assert_eq!(outcome.records[249]["dea_nom_commerce"], "Commerce 249");
}

#[tokio::test]
async fn fetch_all_stops_at_reported_total() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        0,
        json!({"total_count": 200, "results": shops(0, 100)}),
    )
    .await;
    mount_page(
        &server,
        100,
        json!({"total_count": 200, "results": shops(100, 100)}),
    )
    .await;

    let client = test_client(&server);
    let outcome = fetch_all(&client, 100, 50).await;

    assert_eq!(outcome.records.len(), 200);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn fetch_all_keeps_partial_results_when_page_two_fails() {
    let server = MockServer::start().await;
    mount_page(&server, 0, json!(shops(0, 100))).await;
    Mock::given(method("GET"))
        .and(path(RECORDS_PATH))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let outcome = fetch_all(&client, 100, 50).await;

    assert!(!outcome.is_complete());
    assert_eq!(outcome.records.len(), 100);
    assert!(matches!(
        outcome.error,
        Some(OpenDataError::UnexpectedStatus { status: 503, .. })
    ));
    assert_eq!(request_count(&server).await, 2, "failed page is not retried");
}

// ---------------------------------------------------------------------------
// cache over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cache_without_snapshot_reports_blocking_error_on_page_two_failure() {
    let server = MockServer::start().await;
    mount_page(&server, 0, json!(shops(0, 100))).await;
    Mock::given(method("GET"))
        .and(path(RECORDS_PATH))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let mut cache = DatasetCache::new(test_client(&server), CacheSettings::default());
    let result = cache.get_dataset().await;

    assert!(
        matches!(result, Err(OpenDataError::UnexpectedStatus { status: 502, .. })),
        "expected blocking fetch error"
    );
    assert!(cache.snapshot().is_none());
}

#[tokio::test]
async fn cache_serves_repeat_reads_without_requests() {
    let server = MockServer::start().await;
    mount_page(&server, 0, json!(shops(0, 30))).await;

    let mut cache = DatasetCache::new(test_client(&server), CacheSettings::default());
    let first = cache.get_dataset().await.unwrap();
    let second = cache.get_dataset().await.unwrap();

    assert_eq!(first.freshness, Freshness::Refreshed);
    assert_eq!(second.freshness, Freshness::Cached);
    assert_eq!(request_count(&server).await, 1);

    let table = normalize(&second.snapshot.records);
    assert_eq!(table.rows.len(), 30);
    assert_eq!(table.dropped_count(), 0);
}
