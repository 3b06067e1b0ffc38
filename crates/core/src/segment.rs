//! Customer classification derived at query time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::windows::MetricsWindows;

/// Customer bucket by registration age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerSegment {
    New,
    Regular,
    Veteran,
}

impl CustomerSegment {
    /// Classifies a customer with the default thresholds (30 / 365 days).
    pub fn classify(registration_date: NaiveDate, as_of: DateTime<Utc>) -> Self {
        Self::classify_with(registration_date, as_of, &MetricsWindows::default())
    }

    /// Classifies a customer by whole days between registration and `as_of`.
    ///
    /// A registration date after `as_of` counts as age 0 (new).
    pub fn classify_with(
        registration_date: NaiveDate,
        as_of: DateTime<Utc>,
        windows: &MetricsWindows,
    ) -> Self {
        let age_days = (as_of.date_naive() - registration_date).num_days();
        if age_days <= windows.new_customer_days {
            Self::New
        } else if age_days <= windows.regular_customer_days {
            Self::Regular
        } else {
            Self::Veteran
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Regular => "regular",
            Self::Veteran => "veteran",
        }
    }
}

impl fmt::Display for CustomerSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchase activity status of a single customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    /// Last purchase within the recent threshold
    Active,
    /// Purchased inside the lookback window, but not recently
    AtRisk,
    /// No purchase inside the lookback window
    NeverPurchased,
}

impl CustomerStatus {
    /// Classifies by the customer's last purchase date inside the lookback window.
    pub fn classify(
        last_purchase_date: Option<NaiveDate>,
        as_of: DateTime<Utc>,
        windows: &MetricsWindows,
    ) -> Self {
        match last_purchase_date {
            Some(last) if last >= windows.recent_start(as_of) => Self::Active,
            Some(last) if last >= windows.purchase_start(as_of) => Self::AtRisk,
            _ => Self::NeverPurchased,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::AtRisk => "at_risk",
            Self::NeverPurchased => "never_purchased",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
