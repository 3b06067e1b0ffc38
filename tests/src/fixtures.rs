//! Test fixtures and table generators.
//!
//! All timestamps are relative to [`AS_OF`], so expected windows and
//! segments do not drift with the wall clock.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{json, Value};

/// Reference instant used by every metrics fixture.
pub const AS_OF: &str = "2024-06-30T12:00:00Z";

pub fn as_of() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(AS_OF)
        .expect("valid fixture timestamp")
        .with_timezone(&Utc)
}

/// `days` before [`AS_OF`] at 10:00 UTC plus `minutes`, as `YYYY-MM-DD HH:MM:SS`.
pub fn timestamp_days_ago(days: i64, minutes: i64) -> String {
    let base = as_of().date_naive() - Duration::days(days);
    let ts = base.and_hms_opt(10, 0, 0).expect("valid time").and_utc() + Duration::minutes(minutes);
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn date_days_ago(days: i64) -> String {
    (as_of().date_naive() - Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

/// A raw sales event row whose source and ingestion timestamps are `source`.
pub fn raw_event(order: &str, line: &str, txn: &str, source: &str) -> Value {
    json!({
        "order_id": order,
        "line_item_id": line,
        "transaction_id": txn,
        "customer_id": "CUST-12345",
        "product_id": "PROD-78901",
        "transaction_date": "2024-01-15",
        "transaction_timestamp": "2024-01-15 10:30:00.000",
        "sales_channel": "online",
        "unit_price": "29.99",
        "quantity": 2,
        "discount_amount": "5.00",
        "tax_amount": "4.80",
        "shipping_amount": "9.99",
        "status": "completed",
        "payment_method": "credit_card",
        "currency_code": "USD",
        "source_system": "web",
        "source_timestamp": source,
        "original_transaction_id": null,
        "created_at": source
    })
}

/// The late-update scenario: two line items, one of them re-sent with a
/// later source timestamp, plus a second order with a stale duplicate.
pub fn raw_sales_table() -> Value {
    let mut update = raw_event("ORD-001", "LINE-001", "TXN-001-UPDATED", "2024-01-15 10:35:00.000");
    update["discount_amount"] = json!("3.00");

    let mut second_line = raw_event("ORD-001", "LINE-002", "TXN-002", "2024-01-15 10:33:00.000");
    second_line["transaction_timestamp"] = json!("2024-01-15 10:32:00.000");

    let mut retail = raw_event("ORD-002", "LINE-001", "TXN-003", "2024-01-16 14:16:00.000");
    retail["transaction_timestamp"] = json!("2024-01-16 14:15:00.000");
    retail["unit_price"] = json!("99.99");

    let mut stale = raw_event("ORD-002", "LINE-001", "TXN-003-OLD", "2024-01-16 14:10:00.000");
    stale["transaction_timestamp"] = json!("2024-01-16 14:15:00.000");
    stale["unit_price"] = json!("95.99");

    json!([
        raw_event("ORD-001", "LINE-001", "TXN-001", "2024-01-15 10:31:00.000"),
        second_line,
        update,
        retail,
        stale
    ])
}

fn web_event(customer: i64, session: &str, days: i64, minutes: i64, kind: &str, url: &str) -> Value {
    json!({
        "event_id": null,
        "customer_id": customer,
        "session_id": session,
        "event_timestamp": timestamp_days_ago(days, minutes),
        "event_type": kind,
        "page_url": url,
        "device_type": "desktop"
    })
}

/// Web events for five customers; one session falls outside the 7-day window.
pub fn web_events_table() -> Value {
    json!([
        web_event(1001, "sess_1001_001", 1, 0, "page_view", "/home"),
        web_event(1001, "sess_1001_001", 1, 5, "page_view", "/products"),
        web_event(1001, "sess_1001_001", 1, 10, "search", "/search"),
        web_event(1001, "sess_1001_001", 1, 15, "purchase", "/checkout"),
        web_event(1001, "sess_1001_002", 2, 0, "page_view", "/home"),
        web_event(1001, "sess_1001_002", 2, 3, "page_view", "/categories"),
        web_event(1002, "sess_1002_001", 1, 0, "page_view", "/home"),
        web_event(1002, "sess_1002_001", 1, 2, "page_view", "/about"),
        web_event(1002, "sess_1002_001", 1, 5, "page_view", "/contact"),
        web_event(1003, "sess_1003_001", 3, 0, "page_view", "/home"),
        web_event(1003, "sess_1003_001", 3, 8, "purchase", "/checkout"),
        web_event(1003, "sess_1003_002", 5, 0, "page_view", "/products"),
        web_event(1003, "sess_1003_002", 5, 12, "purchase", "/checkout"),
        web_event(1004, "sess_1004_001", 6, 0, "page_view", "/home"),
        web_event(1004, "sess_1004_001", 6, 1, "page_view", "/products"),
        web_event(1004, "sess_1004_001", 6, 3, "page_view", "/categories"),
        web_event(1001, "sess_1001_old", 10, 0, "page_view", "/home")
    ])
}

fn purchase(id: i64, customer: i64, amount: &str, days: i64) -> Value {
    json!({
        "purchase_id": id,
        "customer_id": customer,
        "amount": amount,
        "currency_code": "USD",
        "payment_status": "completed",
        "purchase_date": date_days_ago(days),
        "purchase_timestamp": timestamp_days_ago(days, 0)
    })
}

/// Purchases for four customers; one falls outside the 90-day window.
pub fn purchases_table() -> Value {
    json!([
        purchase(200001, 1001, "299.99", 2),
        purchase(200002, 1001, "199.99", 15),
        purchase(200003, 1001, "179.98", 30),
        purchase(200004, 1002, "49.99", 5),
        purchase(200005, 1002, "29.99", 20),
        purchase(200006, 1003, "1299.99", 1),
        purchase(200007, 1003, "149.99", 10),
        purchase(200008, 1003, "79.99", 25),
        purchase(200009, 1005, "899.99", 45),
        purchase(200010, 1001, "99.99", 120)
    ])
}

/// Profiles in declared-columns form.
pub fn profiles_table() -> Value {
    json!({
        "columns": ["customer_id", "first_name", "location", "membership_tier", "registration_date"],
        "rows": [
            {"customer_id": 1001, "first_name": "John", "location": "San Francisco, CA", "membership_tier": "platinum", "registration_date": "2022-01-15"},
            {"customer_id": 1002, "first_name": "Jane", "location": "New York, NY", "membership_tier": "gold", "registration_date": "2023-06-20"},
            {"customer_id": 1003, "first_name": "Bob", "location": "London, UK", "membership_tier": "silver", "registration_date": "2021-03-10"},
            {"customer_id": 1004, "first_name": "Alice", "location": "Toronto, ON", "membership_tier": "bronze", "registration_date": "2023-11-01"},
            {"customer_id": 1005, "first_name": "Charlie", "location": "Berlin, DE", "membership_tier": "diamond", "registration_date": "2020-08-05"}
        ]
    })
}

/// Full metrics request body pinned to [`AS_OF`].
pub fn metrics_request() -> Value {
    json!({
        "web_events": web_events_table(),
        "purchases": purchases_table(),
        "profiles": profiles_table(),
        "as_of": AS_OF
    })
}

/// A profile registered `days` before [`AS_OF`].
pub fn profile_registered_days_ago(customer: &str, days: i64, tier: &str, location: &str) -> Value {
    let registered: NaiveDate = as_of().date_naive() - Duration::days(days);
    json!({
        "customer_id": customer,
        "registration_date": registered.format("%Y-%m-%d").to_string(),
        "membership_tier": tier,
        "location": location
    })
}
