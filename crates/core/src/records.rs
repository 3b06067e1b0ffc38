//! Input record types for the pipeline.
//!
//! Field names follow the source tables (`raw_sales_events`,
//! `src_web_events`, `src_purchases`, `src_customer_profiles`) so rows can be
//! decoded straight from exported JSON.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::codec;

/// A row-decodable record with a fixed column contract.
pub trait Record: serde::de::DeserializeOwned + Validate {
    /// Table name used in errors and logs.
    const TABLE: &'static str;
    /// Columns that must be present in the table header.
    const REQUIRED_COLUMNS: &'static [&'static str];
    /// Columns that must hold a non-null value in every row.
    const NON_NULL_COLUMNS: &'static [&'static str];
}

/// Natural key of a sales event: `(order_id, line_item_id, transaction_timestamp)`.
pub type NaturalKey = (String, String, DateTime<Utc>);

/// Validates that a monetary amount is strictly positive.
fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() || amount.is_zero() {
        let mut err = ValidationError::new("non_positive_amount");
        err.message = Some(format!("amount must be positive, got {}", amount).into());
        return Err(err);
    }
    Ok(())
}

/// A raw sales line item as ingested, possibly duplicated by late updates.
///
/// Every field is nullable. The deduplicator decides which rows are usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct RawSalesEvent {
    #[serde(default, deserialize_with = "codec::opt_id")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "codec::opt_id")]
    pub line_item_id: Option<String>,
    #[serde(default, deserialize_with = "codec::opt_id")]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "codec::opt_id")]
    pub customer_id: Option<String>,
    #[serde(default, deserialize_with = "codec::opt_id")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "codec::opt_date")]
    pub transaction_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "codec::opt_timestamp")]
    pub transaction_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sales_channel: Option<String>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
    #[serde(default)]
    pub tax_amount: Option<Decimal>,
    #[serde(default)]
    pub shipping_amount: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub source_system: Option<String>,
    /// When the source system last touched the record (late-arriving updates)
    #[serde(default, deserialize_with = "codec::opt_timestamp")]
    pub source_timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "codec::opt_id")]
    pub original_transaction_id: Option<String>,
    /// Ingestion time
    #[serde(default, deserialize_with = "codec::opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RawSalesEvent {
    /// Returns the natural key if all of its parts are present.
    pub fn natural_key(&self) -> Option<NaturalKey> {
        Some((
            self.order_id.clone()?,
            self.line_item_id.clone()?,
            self.transaction_timestamp?,
        ))
    }

    /// Whether the record may take part in deduplication.
    ///
    /// Mirrors the source filter: key parts, customer, product and
    /// transaction date present; unit price and quantity strictly positive.
    pub fn is_valid(&self) -> bool {
        self.order_id.is_some()
            && self.line_item_id.is_some()
            && self.transaction_timestamp.is_some()
            && self.customer_id.is_some()
            && self.product_id.is_some()
            && self.transaction_date.is_some()
            && self.unit_price.is_some_and(|p| p > Decimal::ZERO)
            && self.quantity.is_some_and(|q| q > 0)
    }
}

impl Record for RawSalesEvent {
    const TABLE: &'static str = "raw_sales_events";
    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "order_id",
        "line_item_id",
        "transaction_timestamp",
        "customer_id",
        "product_id",
        "transaction_date",
        "unit_price",
        "quantity",
        "source_timestamp",
        "created_at",
    ];
    const NON_NULL_COLUMNS: &'static [&'static str] = &[];
}

/// A clickstream event tied to a customer session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WebEvent {
    #[serde(default, deserialize_with = "codec::opt_id")]
    pub event_id: Option<String>,
    #[serde(deserialize_with = "codec::id")]
    #[validate(length(min = 1, max = 128))]
    pub customer_id: String,
    #[serde(deserialize_with = "codec::id")]
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[serde(deserialize_with = "codec::timestamp")]
    pub event_timestamp: DateTime<Utc>,
    #[validate(length(min = 1, max = 64))]
    pub event_type: String,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub page_url: Option<String>,
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl Record for WebEvent {
    const TABLE: &'static str = "web_events";
    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "customer_id",
        "session_id",
        "event_timestamp",
        "event_type",
        "page_url",
    ];
    const NON_NULL_COLUMNS: &'static [&'static str] =
        &["customer_id", "session_id", "event_timestamp", "event_type"];
}

/// A completed purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Purchase {
    #[serde(default, deserialize_with = "codec::opt_id")]
    pub purchase_id: Option<String>,
    #[serde(deserialize_with = "codec::id")]
    #[validate(length(min = 1, max = 128))]
    pub customer_id: String,
    #[serde(default, deserialize_with = "codec::opt_id")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "codec::opt_id")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Decimal,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(deserialize_with = "codec::date")]
    pub purchase_date: NaiveDate,
    #[serde(default, deserialize_with = "codec::opt_timestamp")]
    pub purchase_timestamp: Option<DateTime<Utc>>,
}

impl Record for Purchase {
    const TABLE: &'static str = "purchases";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["customer_id", "amount", "purchase_date"];
    const NON_NULL_COLUMNS: &'static [&'static str] = &["customer_id", "amount", "purchase_date"];
}

/// Customer master data. One row per customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CustomerProfile {
    #[serde(deserialize_with = "codec::id")]
    #[validate(length(min = 1, max = 128))]
    pub customer_id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub membership_tier: Option<String>,
    #[serde(deserialize_with = "codec::date")]
    pub registration_date: NaiveDate,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub account_status: Option<String>,
}

impl CustomerProfile {
    /// Minimal profile with only the fields the aggregator groups on.
    pub fn new(
        customer_id: impl Into<String>,
        registration_date: NaiveDate,
        membership_tier: Option<String>,
        location: Option<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            first_name: None,
            last_name: None,
            email: None,
            age_group: None,
            gender: None,
            location,
            membership_tier,
            registration_date,
            email_verified: None,
            account_status: None,
        }
    }
}

impl Record for CustomerProfile {
    const TABLE: &'static str = "customer_profiles";
    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "customer_id",
        "registration_date",
        "membership_tier",
        "location",
    ];
    const NON_NULL_COLUMNS: &'static [&'static str] = &["customer_id", "registration_date"];
}
