//! Customer metrics aggregation.
//!
//! Web events and purchases are rolled up inside their windows, joined onto
//! the profile table and grouped by `(segment, membership_tier, location)`.
//! Profiles drive the join: a customer without activity still counts, with
//! zeros.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::records::{CustomerProfile, Purchase, WebEvent};
use crate::segment::{CustomerSegment, CustomerStatus};
use crate::windows::{MetricsWindows, MONEY_SCALE, PURCHASE_EVENT_TYPE};

/// Per-session activity inside the session window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub customer_id: String,
    pub session_id: String,
    pub total_events: u64,
    /// Distinct non-null `page_url` values
    pub unique_pages_visited: u64,
    pub purchases_in_session: u64,
}

/// Per-customer purchase activity inside the purchase window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseSummary {
    pub customer_id: String,
    pub total_purchases: u64,
    pub total_spent: Decimal,
    pub avg_purchase_amount: Decimal,
    pub first_purchase_date: NaiveDate,
    pub last_purchase_date: NaiveDate,
}

/// One profile joined with its session and purchase rollups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub customer_id: String,
    pub membership_tier: Option<String>,
    pub location: Option<String>,
    pub registration_date: NaiveDate,
    pub customer_segment: CustomerSegment,
    pub session_count: u64,
    pub total_session_events: u64,
    pub avg_events_per_session: f64,
    pub total_purchases: u64,
    pub total_spent: Decimal,
    pub avg_purchase_amount: Decimal,
    pub first_purchase_date: Option<NaiveDate>,
    pub last_purchase_date: Option<NaiveDate>,
    pub status: CustomerStatus,
}

/// Aggregated metrics for one `(segment, membership_tier, location)` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub customer_segment: CustomerSegment,
    pub membership_tier: Option<String>,
    pub location: Option<String>,
    pub customer_count: u64,
    pub avg_sessions: f64,
    pub avg_events_per_session: f64,
    pub avg_total_spent: Decimal,
    pub median_total_spent: Decimal,
    /// Customers whose last purchase falls inside the recent threshold
    pub recent_purchasers: u64,
    /// Customers with purchases in the window, none of them recent
    pub at_risk_customers: u64,
}

type GroupKey = (CustomerSegment, Option<String>, Option<String>);

/// Rounds a monetary value to cents, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator` rounded to cents, 0 when the denominator is 0.
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round_money(Decimal::from(numerator) / Decimal::from(denominator))
        .to_f64()
        .unwrap_or(0.0)
}

fn mean_money(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    round_money(total / Decimal::from(count))
}

/// Median of `values`, rounded to cents. Even counts average the two middles.
///
/// Totals near [`Decimal::MAX`] saturate rather than overflow.
pub fn median(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    let value = if sorted.len() % 2 == 0 {
        let (low, high) = (sorted[mid - 1], sorted[mid]);
        match low.checked_add(high) {
            Some(sum) => sum / Decimal::TWO,
            None => (low / Decimal::TWO).saturating_add(high / Decimal::TWO),
        }
    } else {
        sorted[mid]
    };
    round_money(value)
}

/// Groups in-window web events by `(customer_id, session_id)`.
///
/// Output is ordered by customer then session. Sessions with no event in the
/// window do not appear.
pub fn rollup_sessions(
    events: &[WebEvent],
    as_of: DateTime<Utc>,
    windows: &MetricsWindows,
) -> Vec<SessionSummary> {
    #[derive(Default)]
    struct Acc<'a> {
        total_events: u64,
        pages: BTreeSet<&'a str>,
        purchases: u64,
    }

    let start = windows.session_start(as_of);
    let mut sessions: BTreeMap<(&str, &str), Acc<'_>> = BTreeMap::new();

    for event in events.iter().filter(|e| e.event_timestamp >= start) {
        let acc = sessions
            .entry((event.customer_id.as_str(), event.session_id.as_str()))
            .or_default();
        acc.total_events += 1;
        if let Some(url) = event.page_url.as_deref() {
            acc.pages.insert(url);
        }
        if event.event_type == PURCHASE_EVENT_TYPE {
            acc.purchases += 1;
        }
    }

    sessions
        .into_iter()
        .map(|((customer_id, session_id), acc)| SessionSummary {
            customer_id: customer_id.to_string(),
            session_id: session_id.to_string(),
            total_events: acc.total_events,
            unique_pages_visited: acc.pages.len() as u64,
            purchases_in_session: acc.purchases,
        })
        .collect()
}

/// Groups in-window purchases by customer. Output is ordered by customer id.
///
/// `total_spent` saturates at [`Decimal::MAX`].
pub fn rollup_purchases(
    purchases: &[Purchase],
    as_of: DateTime<Utc>,
    windows: &MetricsWindows,
) -> Vec<PurchaseSummary> {
    struct Acc {
        count: u64,
        total: Decimal,
        first: NaiveDate,
        last: NaiveDate,
    }

    let start = windows.purchase_start(as_of);
    let mut customers: BTreeMap<&str, Acc> = BTreeMap::new();

    for purchase in purchases.iter().filter(|p| p.purchase_date >= start) {
        customers
            .entry(purchase.customer_id.as_str())
            .and_modify(|acc| {
                acc.count += 1;
                acc.total = acc.total.saturating_add(purchase.amount);
                acc.first = acc.first.min(purchase.purchase_date);
                acc.last = acc.last.max(purchase.purchase_date);
            })
            .or_insert(Acc {
                count: 1,
                total: purchase.amount,
                first: purchase.purchase_date,
                last: purchase.purchase_date,
            });
    }

    customers
        .into_iter()
        .map(|(customer_id, acc)| PurchaseSummary {
            customer_id: customer_id.to_string(),
            total_purchases: acc.count,
            total_spent: acc.total,
            avg_purchase_amount: mean_money(acc.total, acc.count as usize),
            first_purchase_date: acc.first,
            last_purchase_date: acc.last,
        })
        .collect()
}

/// Left-joins profiles to their session and purchase rollups.
///
/// Output follows profile order. A repeated customer id keeps its first
/// profile.
pub fn summarize_customers(
    events: &[WebEvent],
    purchases: &[Purchase],
    profiles: &[CustomerProfile],
    as_of: DateTime<Utc>,
    windows: &MetricsWindows,
) -> Vec<CustomerSummary> {
    let mut sessions_by_customer: HashMap<String, (u64, u64)> = HashMap::new();
    for session in rollup_sessions(events, as_of, windows) {
        let entry = sessions_by_customer.entry(session.customer_id).or_default();
        entry.0 += 1;
        entry.1 += session.total_events;
    }

    let purchases_by_customer: HashMap<String, PurchaseSummary> =
        rollup_purchases(purchases, as_of, windows)
            .into_iter()
            .map(|summary| (summary.customer_id.clone(), summary))
            .collect();

    let mut seen = HashSet::new();
    profiles
        .iter()
        .filter(|profile| seen.insert(profile.customer_id.as_str()))
        .map(|profile| {
            let (session_count, total_session_events) = sessions_by_customer
                .get(&profile.customer_id)
                .copied()
                .unwrap_or_default();
            let purchase = purchases_by_customer.get(&profile.customer_id);
            let last_purchase_date = purchase.map(|p| p.last_purchase_date);

            CustomerSummary {
                customer_id: profile.customer_id.clone(),
                membership_tier: profile.membership_tier.clone(),
                location: profile.location.clone(),
                registration_date: profile.registration_date,
                customer_segment: CustomerSegment::classify_with(
                    profile.registration_date,
                    as_of,
                    windows,
                ),
                session_count,
                total_session_events,
                avg_events_per_session: ratio(total_session_events, session_count),
                total_purchases: purchase.map_or(0, |p| p.total_purchases),
                total_spent: purchase.map_or(Decimal::ZERO, |p| p.total_spent),
                avg_purchase_amount: purchase.map_or(Decimal::ZERO, |p| p.avg_purchase_amount),
                first_purchase_date: purchase.map(|p| p.first_purchase_date),
                last_purchase_date,
                status: CustomerStatus::classify(last_purchase_date, as_of, windows),
            }
        })
        .collect()
}

/// Aggregates customer summaries into one row per non-empty group.
///
/// Rows are ordered by segment, then tier, then location (nulls first).
pub fn group_metrics(customers: &[CustomerSummary]) -> Vec<MetricsRow> {
    let mut groups: BTreeMap<GroupKey, Vec<&CustomerSummary>> = BTreeMap::new();
    for customer in customers {
        groups
            .entry((
                customer.customer_segment,
                customer.membership_tier.clone(),
                customer.location.clone(),
            ))
            .or_default()
            .push(customer);
    }

    groups
        .into_iter()
        .map(|((customer_segment, membership_tier, location), members)| {
            let customer_count = members.len() as u64;
            let sessions: u64 = members.iter().map(|c| c.session_count).sum();
            let events: u64 = members.iter().map(|c| c.total_session_events).sum();
            let spent: Vec<Decimal> = members.iter().map(|c| c.total_spent).collect();
            let total_spent = spent
                .iter()
                .fold(Decimal::ZERO, |total, amount| total.saturating_add(*amount));

            MetricsRow {
                customer_segment,
                membership_tier,
                location,
                customer_count,
                avg_sessions: ratio(sessions, customer_count),
                avg_events_per_session: ratio(events, sessions),
                avg_total_spent: mean_money(total_spent, members.len()),
                median_total_spent: median(&spent),
                recent_purchasers: members
                    .iter()
                    .filter(|c| c.status == CustomerStatus::Active)
                    .count() as u64,
                at_risk_customers: members
                    .iter()
                    .filter(|c| c.status == CustomerStatus::AtRisk)
                    .count() as u64,
            }
        })
        .collect()
}

/// Computes grouped customer metrics with the default windows.
pub fn compute_customer_metrics(
    web_events: &[WebEvent],
    purchases: &[Purchase],
    profiles: &[CustomerProfile],
    as_of: DateTime<Utc>,
) -> Vec<MetricsRow> {
    compute_customer_metrics_with(
        web_events,
        purchases,
        profiles,
        as_of,
        &MetricsWindows::default(),
    )
}

/// Computes grouped customer metrics with explicit windows.
pub fn compute_customer_metrics_with(
    web_events: &[WebEvent],
    purchases: &[Purchase],
    profiles: &[CustomerProfile],
    as_of: DateTime<Utc>,
    windows: &MetricsWindows,
) -> Vec<MetricsRow> {
    let customers = summarize_customers(web_events, purchases, profiles, as_of, windows);
    let rows = group_metrics(&customers);
    debug!(
        web_events = web_events.len(),
        purchases = purchases.len(),
        customers = customers.len(),
        groups = rows.len(),
        %as_of,
        "Computed customer metrics"
    );
    rows
}
