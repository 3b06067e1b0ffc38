//! Time windows and thresholds used by the metrics aggregator.
//!
//! Every window is measured backwards from the caller-supplied `as_of`
//! instant. Nothing in the pipeline reads the wall clock.
//!
//! # Boundaries
//!
//! - Session window: `event_timestamp >= as_of - session_days` (instant).
//! - Purchase window: `purchase_date >= as_of.date - purchase_days` (calendar).
//! - Recent threshold: `last_purchase_date >= as_of.date - recent_days`.
//! - Segment: age in days `<= new_customer_days` is new,
//!   `<= regular_customer_days` is regular, otherwise veteran.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigErrorCode, Error, Result};

// === Window defaults (days) ===

/// Web events older than this do not contribute to session rollups.
pub const DEFAULT_SESSION_WINDOW_DAYS: i64 = 7;

/// Purchases older than this do not contribute to purchase rollups.
pub const DEFAULT_PURCHASE_WINDOW_DAYS: i64 = 90;

/// A last purchase inside this many days makes a customer a recent purchaser.
pub const DEFAULT_RECENT_PURCHASE_DAYS: i64 = 30;

/// Registration age at or below which a customer is "new".
pub const NEW_CUSTOMER_MAX_AGE_DAYS: i64 = 30;

/// Registration age at or below which a customer is "regular".
pub const REGULAR_CUSTOMER_MAX_AGE_DAYS: i64 = 365;

/// Upper bound on any configured window (100 years).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

// === Record constants ===

/// Web event type counted as an in-session purchase.
pub const PURCHASE_EVENT_TYPE: &str = "purchase";

/// Decimal places kept on monetary averages and medians.
pub const MONEY_SCALE: u32 = 2;

/// Window configuration for the metrics aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsWindows {
    pub session_days: i64,
    pub purchase_days: i64,
    pub recent_days: i64,
    pub new_customer_days: i64,
    pub regular_customer_days: i64,
}

impl Default for MetricsWindows {
    fn default() -> Self {
        Self {
            session_days: DEFAULT_SESSION_WINDOW_DAYS,
            purchase_days: DEFAULT_PURCHASE_WINDOW_DAYS,
            recent_days: DEFAULT_RECENT_PURCHASE_DAYS,
            new_customer_days: NEW_CUSTOMER_MAX_AGE_DAYS,
            regular_customer_days: REGULAR_CUSTOMER_MAX_AGE_DAYS,
        }
    }
}

impl MetricsWindows {
    /// Checks that the windows are positive, bounded and nested.
    ///
    /// `recent_days` must fit inside `purchase_days`, otherwise recent and
    /// at-risk customers would stop being disjoint subsets of purchasers.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("session_days", self.session_days),
            ("purchase_days", self.purchase_days),
            ("recent_days", self.recent_days),
            ("new_customer_days", self.new_customer_days),
            ("regular_customer_days", self.regular_customer_days),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(Error::config(
                    ConfigErrorCode::InvalidWindow,
                    format!("{} must be positive, got {}", name, value),
                ));
            }
            if value > MAX_WINDOW_DAYS {
                return Err(Error::config(
                    ConfigErrorCode::InvalidWindow,
                    format!(
                        "{} must be at most {} days, got {}",
                        name, MAX_WINDOW_DAYS, value
                    ),
                ));
            }
        }

        if self.recent_days > self.purchase_days {
            return Err(Error::config(
                ConfigErrorCode::InvalidWindow,
                format!(
                    "recent_days ({}) cannot exceed purchase_days ({})",
                    self.recent_days, self.purchase_days
                ),
            ));
        }

        if self.new_customer_days > self.regular_customer_days {
            return Err(Error::config(
                ConfigErrorCode::InvalidWindow,
                format!(
                    "new_customer_days ({}) cannot exceed regular_customer_days ({})",
                    self.new_customer_days, self.regular_customer_days
                ),
            ));
        }

        Ok(())
    }

    /// Earliest event instant that still counts toward sessions.
    ///
    /// Clamps to the earliest representable instant instead of overflowing.
    pub fn session_start(&self, as_of: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::try_days(self.session_days)
            .and_then(|window| as_of.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Earliest purchase date that still counts toward purchase rollups.
    pub fn purchase_start(&self, as_of: DateTime<Utc>) -> NaiveDate {
        days_before(as_of, self.purchase_days)
    }

    /// Earliest last-purchase date that counts as recent.
    pub fn recent_start(&self, as_of: DateTime<Utc>) -> NaiveDate {
        days_before(as_of, self.recent_days)
    }
}

/// `as_of.date - days`, clamped to [`NaiveDate::MIN`].
fn days_before(as_of: DateTime<Utc>, days: i64) -> NaiveDate {
    TimeDelta::try_days(days)
        .and_then(|window| as_of.date_naive().checked_sub_signed(window))
        .unwrap_or(NaiveDate::MIN)
}
