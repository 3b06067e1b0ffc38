//! Error envelope tests.
//!
//! Every rejection is a JSON `ErrorResponse` with `success: false`.

use api::state::AppState;
use axum::http::StatusCode;
use integration_tests::{fixtures, setup::TestContext};
use serde_json::{json, Value};

fn assert_error_envelope(body: &Value, error_type: &str) {
    assert_eq!(body["success"], false);
    assert_eq!(body["error_type"], error_type);
    assert!(body["error_message"].is_string());
}

/// A table missing a required column fails the whole request
#[tokio::test]
async fn test_missing_column_is_schema_error() {
    let mut request = fixtures::metrics_request();
    request["web_events"] = json!([
        { "customer_id": 1001, "event_timestamp": "2024-06-29 10:00:00", "event_type": "page_view" }
    ]);

    let response = TestContext::new()
        .server()
        .post("/v1/customer-metrics")
        .json(&request)
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_error_envelope(&body, "SchemaError");
    assert_eq!(body["error_code"], "SCHEMA_001");
    assert_eq!(body["error_details"]["table"], "web_events");
    assert_eq!(body["error_details"]["column"], "session_id");
}

#[tokio::test]
async fn test_declared_columns_checked_without_rows() {
    let response = TestContext::new()
        .server()
        .post("/v1/deduplicate")
        .json(&json!({ "raw_events": { "columns": ["order_id"], "rows": [] } }))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_error_envelope(&body, "SchemaError");
    assert_eq!(body["error_details"]["table"], "raw_sales_events");
}

#[tokio::test]
async fn test_malformed_json() {
    let response = TestContext::new()
        .server()
        .post("/v1/deduplicate")
        .content_type("application/json")
        .text("{\"raw_events\": [")
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_error_envelope(&body, "ValidationError");
    assert_eq!(body["error_code"], "VALID_002");
}

/// Valid JSON that is not a table document
#[tokio::test]
async fn test_wrong_shape() {
    let response = TestContext::new()
        .server()
        .post("/v1/deduplicate")
        .json(&json!({ "raw_events": 5 }))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_error_envelope(&body, "ValidationError");
    assert_eq!(body["error_code"], "VALID_001");
}

#[tokio::test]
async fn test_missing_raw_events_field() {
    let response = TestContext::new()
        .server()
        .post("/v1/deduplicate")
        .json(&json!({}))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error_code"], "VALID_001");
}

#[tokio::test]
async fn test_empty_body() {
    let response = TestContext::new()
        .server()
        .post("/v1/customer-metrics")
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_error_envelope(&body, "ValidationError");
}

#[tokio::test]
async fn test_unparseable_as_of() {
    let mut request = fixtures::metrics_request();
    request["as_of"] = json!("next tuesday");

    let response = TestContext::new()
        .server()
        .post("/v1/customer-summaries")
        .json(&request)
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_error_envelope(&body, "ValidationError");
    assert_eq!(body["error_details"]["field"], "as_of");
}

/// Parseable but outside the supported calendar
#[tokio::test]
async fn test_extreme_as_of_rejected() {
    let mut request = fixtures::metrics_request();
    request["as_of"] = json!("-262143-01-05 00:00:00");

    let response = TestContext::new()
        .server()
        .post("/v1/customer-metrics")
        .json(&request)
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_error_envelope(&body, "ValidationError");
    assert_eq!(body["error_details"]["field"], "as_of");
}

#[tokio::test]
async fn test_unknown_route() {
    let response = TestContext::new()
        .server()
        .get("/v1/nope")
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_error_envelope(&body, "NotFound");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let state = AppState::default().with_max_body_bytes(1024);
    let server = TestContext::with_state(state).server();

    let response = server
        .post("/v1/deduplicate")
        .json(&json!({ "raw_events": fixtures::raw_sales_table() }))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json();
    assert_error_envelope(&body, "PayloadError");
}
