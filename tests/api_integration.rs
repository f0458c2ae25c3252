//! End-to-end tests through the HTTP router and a fake Starpoint server.

mod common;

use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN};
use axum::http::{HeaderValue, Method, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use common::{
    gateway_router, gateway_state, BrokenEncoder, FakeStarpoint, HashEncoder, FAKE_DIM,
};
use starpoint_search::{
    ApiServer, ApiSettings, AppState, MetricsService, QueryEncoder, SearchHandler,
    StarpointClient, VectorStoreSettings,
};

fn embedding_norm(values: &[Value]) -> f64 {
    values
        .iter()
        .map(|v| v.as_f64().unwrap().powi(2))
        .sum::<f64>()
        .sqrt()
}

#[tokio::test]
async fn test_text_query_is_embedded_and_forwarded() {
    let reply = json!({"collection_id": "c-1", "results": [{"id": "p1", "__distance": 0.12}]});
    let store = FakeStarpoint::ok(reply.clone()).await;
    let encoder = Arc::new(HashEncoder::default());
    let server = TestServer::new(gateway_router(encoder.clone(), &store)).unwrap();

    let response = server
        .post("/search")
        .json(&json!({
            "starpoint_api_key": "k1",
            "starpoint_collection_name": "docs",
            "query_to_embed": "red shoes",
            "sql": null
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), reply);
    assert_eq!(encoder.calls(), vec!["red shoes".to_string()]);

    let queries = store.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].api_key.as_deref(), Some("k1"));

    let body = &queries[0].body;
    assert_eq!(body["collection_name"], "docs");
    assert!(body["sql"].is_null());
    let values = body["query_embedding"]["values"].as_array().unwrap();
    assert_eq!(values.len(), FAKE_DIM);
    assert_eq!(body["query_embedding"]["dimensionality"], FAKE_DIM);
    assert!((embedding_norm(values) - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_filter_query_skips_encoder() {
    let store = FakeStarpoint::ok(json!({"results": []})).await;
    let encoder = Arc::new(HashEncoder::default());
    let server = TestServer::new(gateway_router(encoder.clone(), &store)).unwrap();

    let response = server
        .post("/search")
        .json(&json!({
            "starpoint_api_key": "k1",
            "starpoint_collection_name": "docs",
            "query_to_embed": null,
            "sql": "price < 10"
        }))
        .await;

    response.assert_status_ok();
    assert!(encoder.calls().is_empty());

    let queries = store.queries();
    assert_eq!(queries[0].body["sql"], "price < 10");
    assert!(queries[0].body["query_embedding"].is_null());
}

#[tokio::test]
async fn test_empty_filter_is_forwarded_as_null() {
    let store = FakeStarpoint::ok(json!({"results": []})).await;
    let server =
        TestServer::new(gateway_router(Arc::new(HashEncoder::default()), &store)).unwrap();

    server
        .post("/search")
        .json(&json!({
            "starpoint_api_key": "k1",
            "starpoint_collection_name": "docs",
            "sql": ""
        }))
        .await
        .assert_status_ok();

    let queries = store.queries();
    assert!(queries[0].body["sql"].is_null());
    assert!(queries[0].body["query_embedding"].is_null());
}

#[tokio::test]
async fn test_blank_api_key_is_rejected_without_downstream_call() {
    let store = FakeStarpoint::ok(json!({"results": []})).await;
    let encoder = Arc::new(HashEncoder::default());
    let server = TestServer::new(gateway_router(encoder.clone(), &store)).unwrap();

    let response = server
        .post("/search")
        .json(&json!({
            "starpoint_api_key": "",
            "starpoint_collection_name": "docs",
            "query_to_embed": "red shoes"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["kind"], "validation_error");
    assert!(encoder.calls().is_empty());
    assert!(store.queries().is_empty());
}

#[tokio::test]
async fn test_missing_collection_is_rejected() {
    let store = FakeStarpoint::ok(json!({})).await;
    let server =
        TestServer::new(gateway_router(Arc::new(HashEncoder::default()), &store)).unwrap();

    let response = server
        .post("/search")
        .json(&json!({"starpoint_api_key": "k1"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.text().contains("starpoint_collection_name"));
    assert!(store.queries().is_empty());
}

#[tokio::test]
async fn test_downstream_rejection_is_mirrored() {
    let store = FakeStarpoint::start(
        StatusCode::UNAUTHORIZED,
        json!({"error": "invalid api key"}),
    )
    .await;
    let server =
        TestServer::new(gateway_router(Arc::new(HashEncoder::default()), &store)).unwrap();

    let response = server
        .post("/search")
        .json(&json!({
            "starpoint_api_key": "wrong-key-123",
            "starpoint_collection_name": "docs",
            "sql": "price < 10"
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let text = response.text();
    assert!(text.contains("downstream_error"));
    assert!(text.contains("invalid api key"));
    assert!(!text.contains("wrong-key-123"));
    assert_eq!(store.queries().len(), 1);
}

#[tokio::test]
async fn test_unreachable_store_is_bad_gateway() {
    // Reserve a port, then free it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = StarpointClient::new(&VectorStoreSettings {
        base_url: format!("http://{}", addr),
        request_timeout_secs: 2,
    })
    .unwrap();
    let handler = SearchHandler::new(Arc::new(HashEncoder::default()), Arc::new(store));
    let server = TestServer::new(
        ApiServer::with_state(ApiSettings::default(), AppState::new(handler)).router(),
    )
    .unwrap();

    let response = server
        .post("/search")
        .json(&json!({"starpoint_api_key": "k1", "starpoint_collection_name": "docs"}))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(response.json::<Value>()["error"]["kind"], "downstream_error");
}

#[tokio::test]
async fn test_get_with_json_body_is_accepted() {
    let store = FakeStarpoint::ok(json!({"results": []})).await;
    let server =
        TestServer::new(gateway_router(Arc::new(HashEncoder::default()), &store)).unwrap();

    server
        .get("/search")
        .json(&json!({
            "starpoint_api_key": "k1",
            "starpoint_collection_name": "docs",
            "query_to_embed": "blue hat"
        }))
        .await
        .assert_status_ok();

    assert_eq!(store.queries().len(), 1);
}

#[tokio::test]
async fn test_malformed_body_is_client_error() {
    let store = FakeStarpoint::ok(json!({})).await;
    let server =
        TestServer::new(gateway_router(Arc::new(HashEncoder::default()), &store)).unwrap();

    let response = server
        .post("/search")
        .content_type("application/json")
        .text("{not json")
        .await;

    assert!(response.status_code().is_client_error());
    assert!(store.queries().is_empty());
}

#[tokio::test]
async fn test_health_reports_encoder() {
    let store = FakeStarpoint::ok(json!({})).await;
    let encoder = Arc::new(HashEncoder::default());
    let server = TestServer::new(gateway_router(encoder.clone(), &store)).unwrap();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let health = response.json::<starpoint_search::HealthResponse>();
    assert_eq!(health.status, "ok");
    assert_eq!(health.encoder, encoder.descriptor());
    assert_eq!(health.encoder.device, "cpu");
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let store = FakeStarpoint::ok(json!({})).await;
    let server =
        TestServer::new(gateway_router(Arc::new(HashEncoder::default()), &store)).unwrap();

    let response = server
        .method(Method::OPTIONS, "/search")
        .add_header(ORIGIN, HeaderValue::from_static("https://app.example.com"))
        .add_header(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("POST"))
        .await;

    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://app.example.com"
    );
}

#[tokio::test]
async fn test_metrics_route_absent_without_exporter() {
    let store = FakeStarpoint::ok(json!({})).await;
    let server =
        TestServer::new(gateway_router(Arc::new(HashEncoder::default()), &store)).unwrap();

    server.get("/metrics").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_key_with_control_character_is_rejected_before_encoding() {
    let store = FakeStarpoint::ok(json!({"results": []})).await;
    let encoder = Arc::new(HashEncoder::default());
    let server = TestServer::new(gateway_router(encoder.clone(), &store)).unwrap();

    let response = server
        .post("/search")
        .json(&json!({
            "starpoint_api_key": "bad\nkey",
            "starpoint_collection_name": "docs",
            "query_to_embed": "red shoes"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["kind"], "validation_error");
    assert!(encoder.calls().is_empty(), "encoder ran for a rejected key");
    assert!(store.queries().is_empty());
}

#[tokio::test]
async fn test_encoder_failure_is_internal_error() {
    let store = FakeStarpoint::ok(json!({"results": []})).await;
    let state = gateway_state(Arc::new(BrokenEncoder), &store);
    let server =
        TestServer::new(ApiServer::with_state(ApiSettings::default(), state).router()).unwrap();

    let response = server
        .post("/search")
        .json(&json!({
            "starpoint_api_key": "k1",
            "starpoint_collection_name": "docs",
            "query_to_embed": "red shoes"
        }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["kind"], "encoding_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("onnx session poisoned"));
    assert!(store.queries().is_empty());
}

// The only test in this binary that installs the global recorder.
#[tokio::test]
async fn test_metrics_route_exports_search_counters() {
    let metrics = MetricsService::install().unwrap();
    let store = FakeStarpoint::ok(json!({"results": []})).await;
    let state = gateway_state(Arc::new(HashEncoder::default()), &store).with_metrics(metrics);
    let server =
        TestServer::new(ApiServer::with_state(ApiSettings::default(), state).router()).unwrap();

    server
        .post("/search")
        .json(&json!({
            "starpoint_api_key": "k1",
            "starpoint_collection_name": "docs",
            "query_to_embed": "red shoes"
        }))
        .await
        .assert_status_ok();

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("search_requests_total"));
    assert!(text.contains("outcome=\"ok\""));
    assert!(text.contains("query_encodings_total"));
    assert!(text.contains("vector_store_query_seconds"));
}
