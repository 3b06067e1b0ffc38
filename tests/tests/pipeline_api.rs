//! End-to-end tests for the pipeline endpoints.
//!
//! Drives the real router (all middleware included) through an in-process
//! test server. Metrics fixtures are pinned to a fixed `as_of`.

use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use pipeline_core::MetricsWindows;
use rust_decimal::Decimal;
use serde_json::{json, Value};

fn server() -> TestServer {
    TestContext::new().server()
}

fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected decimal string, got {}", value))
        .parse()
        .expect("valid decimal")
}

fn row_for<'a>(rows: &'a [Value], tier: &str) -> &'a Value {
    rows.iter()
        .find(|row| row["membership_tier"] == tier)
        .unwrap_or_else(|| panic!("no row for tier {}", tier))
}

/// Late updates replace earlier versions of the same line item
#[tokio::test]
async fn test_deduplicate_keeps_latest_version() {
    let response = server()
        .post("/v1/deduplicate")
        .json(&json!({ "raw_events": fixtures::raw_sales_table() }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 3);

    let records = body["data"]["records"].as_array().expect("records array");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["transaction_id"], "TXN-001-UPDATED");
    assert_eq!(decimal(&records[0]["discount_amount"]), Decimal::new(300, 2));
    assert_eq!(records[1]["line_item_id"], "LINE-002");
    assert_eq!(records[2]["transaction_id"], "TXN-003");
    assert_eq!(decimal(&records[2]["unit_price"]), Decimal::new(9999, 2));

    let report = &body["data"]["report"];
    assert_eq!(report["input_records"], 5);
    assert_eq!(report["duplicates_removed"], 2);
    assert_eq!(report["output_records"], 3);
}

/// Posting the output back yields the same records
#[tokio::test]
async fn test_deduplicate_is_idempotent_over_http() {
    let server = server();

    let first: Value = server
        .post("/v1/deduplicate")
        .json(&json!({ "raw_events": fixtures::raw_sales_table() }))
        .await
        .json();
    let records = first["data"]["records"].clone();

    let second: Value = server
        .post("/v1/deduplicate")
        .json(&json!({ "raw_events": records }))
        .await
        .json();

    assert_eq!(second["data"]["records"], first["data"]["records"]);
    assert_eq!(second["data"]["report"]["duplicates_removed"], 0);
}

/// Invalid rows are dropped and counted, never fatal
#[tokio::test]
async fn test_deduplicate_drops_invalid_rows() {
    let mut zero_price = fixtures::raw_event("ORD-9", "L1", "TXN-9", "2024-01-15 11:00:00");
    zero_price["unit_price"] = json!("0.00");
    let mut bad_timestamp = fixtures::raw_event("ORD-8", "L1", "TXN-8", "2024-01-15 11:00:00");
    bad_timestamp["transaction_timestamp"] = json!("not a time");
    let valid = fixtures::raw_event("ORD-7", "L1", "TXN-7", "2024-01-15 11:00:00");

    let response = server()
        .post("/v1/deduplicate")
        .json(&json!({ "raw_events": [zero_price, bad_timestamp, valid] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"]["validation"]["invalid_records"], 1);
    assert_eq!(body["data"]["validation"]["errors_by_field"]["_row"], 1);
    assert_eq!(body["data"]["report"]["invalid_records"], 1);
}

/// Grouped metrics over the five-customer fixture
#[tokio::test]
async fn test_customer_metrics_groups() {
    let response = server()
        .post("/v1/customer-metrics")
        .json(&fixtures::metrics_request())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 5);
    assert_eq!(body["data"]["customers"], 5);
    assert_eq!(body["data"]["as_of"], "2024-06-30T12:00:00Z");

    let rows = body["data"]["rows"].as_array().expect("rows array");
    let total: u64 = rows.iter().map(|r| r["customer_count"].as_u64().unwrap()).sum();
    assert_eq!(total, 5);

    // Ordered by segment first
    assert_eq!(rows[0]["customer_segment"], "regular");
    assert_eq!(rows[0]["membership_tier"], "bronze");

    let platinum = row_for(rows, "platinum");
    assert_eq!(platinum["customer_segment"], "veteran");
    assert_eq!(platinum["avg_sessions"], 2.0);
    assert_eq!(platinum["avg_events_per_session"], 3.0);
    assert_eq!(decimal(&platinum["avg_total_spent"]), Decimal::new(67996, 2));
    assert_eq!(decimal(&platinum["median_total_spent"]), Decimal::new(67996, 2));
    assert_eq!(platinum["recent_purchasers"], 1);
    assert_eq!(platinum["at_risk_customers"], 0);

    let silver = row_for(rows, "silver");
    assert_eq!(silver["avg_sessions"], 2.0);
    assert_eq!(silver["avg_events_per_session"], 2.0);
    assert_eq!(decimal(&silver["avg_total_spent"]), Decimal::new(152997, 2));

    let diamond = row_for(rows, "diamond");
    assert_eq!(diamond["avg_sessions"], 0.0);
    assert_eq!(diamond["recent_purchasers"], 0);
    assert_eq!(diamond["at_risk_customers"], 1);

    let bronze = row_for(rows, "bronze");
    assert_eq!(bronze["avg_sessions"], 1.0);
    assert_eq!(decimal(&bronze["avg_total_spent"]), Decimal::ZERO);

    for row in rows {
        let count = row["customer_count"].as_u64().unwrap();
        let recent = row["recent_purchasers"].as_u64().unwrap();
        let at_risk = row["at_risk_customers"].as_u64().unwrap();
        assert!(recent + at_risk <= count);
    }
}

/// Per-customer summaries carry segment and status
#[tokio::test]
async fn test_customer_summaries() {
    let response = server()
        .post("/v1/customer-summaries")
        .json(&fixtures::metrics_request())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 5);

    let customers = body["data"]["customers"].as_array().expect("customers array");
    let ids: Vec<&str> = customers
        .iter()
        .map(|c| c["customer_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1001", "1002", "1003", "1004", "1005"]);

    assert_eq!(customers[0]["status"], "active");
    assert_eq!(customers[0]["session_count"], 2);
    assert_eq!(customers[0]["total_purchases"], 3);
    assert_eq!(customers[0]["last_purchase_date"], fixtures::date_days_ago(2));

    assert_eq!(customers[3]["customer_segment"], "regular");
    assert_eq!(customers[3]["status"], "never_purchased");
    assert_eq!(customers[3]["last_purchase_date"], Value::Null);

    assert_eq!(customers[4]["status"], "at_risk");
    assert_eq!(customers[4]["session_count"], 0);
}

/// Segment thresholds at 30 and 365 days
#[tokio::test]
async fn test_segment_boundaries() {
    let profiles = json!([
        fixtures::profile_registered_days_ago("a", 30, "gold", "Berlin"),
        fixtures::profile_registered_days_ago("b", 31, "gold", "Berlin"),
        fixtures::profile_registered_days_ago("c", 365, "gold", "Berlin"),
        fixtures::profile_registered_days_ago("d", 366, "gold", "Berlin")
    ]);

    let body: Value = server()
        .post("/v1/customer-summaries")
        .json(&json!({ "profiles": profiles, "as_of": fixtures::AS_OF }))
        .await
        .json();

    let segments: Vec<&str> = body["data"]["customers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["customer_segment"].as_str().unwrap())
        .collect();
    assert_eq!(segments, vec!["new", "regular", "regular", "veteran"]);
}

/// Empty tables are an empty result, not an error
#[tokio::test]
async fn test_empty_tables() {
    let response = server()
        .post("/v1/customer-metrics")
        .json(&json!({
            "web_events": [],
            "purchases": [],
            "profiles": [],
            "as_of": fixtures::AS_OF
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 0);
    assert_eq!(body["data"]["rows"], json!([]));
}

/// Profiles without activity still count
#[tokio::test]
async fn test_profiles_without_activity() {
    let mut request = fixtures::metrics_request();
    request["web_events"] = json!([]);
    request["purchases"] = json!([]);

    let body: Value = server()
        .post("/v1/customer-metrics")
        .json(&request)
        .await
        .json();

    assert_eq!(body["data"]["customers"], 5);
    let rows = body["data"]["rows"].as_array().unwrap();
    assert!(rows.iter().all(|r| r["avg_sessions"] == 0.0));
    assert!(rows.iter().all(|r| r["recent_purchasers"] == 0));
}

/// Windows come from server state
#[tokio::test]
async fn test_configured_windows_apply() {
    let windows = MetricsWindows {
        session_days: 2,
        ..MetricsWindows::default()
    };
    let server = TestContext::with_windows(windows).server();

    let body: Value = server
        .post("/v1/customer-summaries")
        .json(&fixtures::metrics_request())
        .await
        .json();

    let sessions: u64 = body["data"]["customers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["session_count"].as_u64().unwrap())
        .sum();
    assert_eq!(sessions, 2);
}

/// Repeated profile ids are counted as invalid
#[tokio::test]
async fn test_duplicate_profiles_reported() {
    let profiles = json!([
        fixtures::profile_registered_days_ago("a", 10, "gold", "Berlin"),
        fixtures::profile_registered_days_ago("a", 400, "bronze", "Paris")
    ]);

    let body: Value = server()
        .post("/v1/customer-metrics")
        .json(&json!({ "profiles": profiles, "as_of": fixtures::AS_OF }))
        .await
        .json();

    assert_eq!(body["data"]["customers"], 1);
    assert_eq!(body["data"]["rows"][0]["membership_tier"], "gold");
    let stats = &body["data"]["validation"]["profiles"];
    assert_eq!(stats["invalid_records"], 1);
    assert_eq!(stats["errors_by_field"]["customer_id"], 1);
}
