//! Table-level entry points: decode row-sets, run a stage, keep the stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::dedup::{deduplicate_with_report, DedupReport};
use crate::error::Result;
use crate::metrics::{
    compute_customer_metrics_with, summarize_customers, CustomerSummary, MetricsRow,
};
use crate::records::{CustomerProfile, Purchase, RawSalesEvent, Record, WebEvent};
use crate::table::{decode, RowSet, ValidationStats};
use crate::windows::MetricsWindows;

/// Result of deduplicating a raw event table.
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub records: Vec<RawSalesEvent>,
    pub report: DedupReport,
    /// Row decoding stats (the validity filter is counted in `report`)
    pub stats: ValidationStats,
}

/// Decodes a raw sales event table and deduplicates it.
pub fn deduplicate_table(raw_events: &RowSet) -> Result<DedupOutcome> {
    let decoded = decode::<RawSalesEvent>(raw_events)?;
    let (records, report) = deduplicate_with_report(decoded.records);
    Ok(DedupOutcome {
        records,
        report,
        stats: decoded.stats,
    })
}

/// Validation stats for each metrics input table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableStats {
    pub web_events: ValidationStats,
    pub purchases: ValidationStats,
    pub profiles: ValidationStats,
}

/// Decoded metrics inputs, ready for aggregation.
#[derive(Debug, Clone)]
pub struct MetricsInput {
    pub web_events: Vec<WebEvent>,
    pub purchases: Vec<Purchase>,
    /// Unique by customer id
    pub profiles: Vec<CustomerProfile>,
    pub stats: TableStats,
}

impl MetricsInput {
    pub fn metrics(&self, as_of: DateTime<Utc>, windows: &MetricsWindows) -> Vec<MetricsRow> {
        compute_customer_metrics_with(
            &self.web_events,
            &self.purchases,
            &self.profiles,
            as_of,
            windows,
        )
    }

    pub fn summaries(&self, as_of: DateTime<Utc>, windows: &MetricsWindows) -> Vec<CustomerSummary> {
        summarize_customers(
            &self.web_events,
            &self.purchases,
            &self.profiles,
            as_of,
            windows,
        )
    }
}

/// Decodes the three metrics tables.
///
/// All three column contracts are checked before any rows are decoded, so a
/// schema error never leaves partial work behind. Repeated profile ids keep
/// the first row and count the rest as invalid under `customer_id`.
pub fn decode_metrics_input(
    web_events: &RowSet,
    purchases: &RowSet,
    profiles: &RowSet,
) -> Result<MetricsInput> {
    web_events.require_columns(WebEvent::TABLE, WebEvent::REQUIRED_COLUMNS)?;
    purchases.require_columns(Purchase::TABLE, Purchase::REQUIRED_COLUMNS)?;
    profiles.require_columns(CustomerProfile::TABLE, CustomerProfile::REQUIRED_COLUMNS)?;

    let web = decode::<WebEvent>(web_events)?;
    let bought = decode::<Purchase>(purchases)?;
    let mut people = decode::<CustomerProfile>(profiles)?;

    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(people.records.len());
    for profile in people.records {
        if seen.insert(profile.customer_id.clone()) {
            unique.push(profile);
        } else {
            people.stats.reject_valid("customer_id");
        }
    }

    Ok(MetricsInput {
        web_events: web.records,
        purchases: bought.records,
        profiles: unique,
        stats: TableStats {
            web_events: web.stats,
            purchases: bought.stats,
            profiles: people.stats,
        },
    })
}

/// Result of computing grouped metrics from tables.
#[derive(Debug, Clone)]
pub struct MetricsOutcome {
    pub rows: Vec<MetricsRow>,
    pub customers: usize,
    pub stats: TableStats,
}

/// Decodes the three tables and computes grouped metrics.
pub fn compute_customer_metrics_table(
    web_events: &RowSet,
    purchases: &RowSet,
    profiles: &RowSet,
    as_of: DateTime<Utc>,
    windows: &MetricsWindows,
) -> Result<MetricsOutcome> {
    let input = decode_metrics_input(web_events, purchases, profiles)?;
    Ok(MetricsOutcome {
        rows: input.metrics(as_of, windows),
        customers: input.profiles.len(),
        stats: input.stats,
    })
}
