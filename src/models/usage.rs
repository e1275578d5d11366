//! Quota usage models

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One itemized consumption record
///
/// `quota_cost` is stored at ten times its display unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaUsageEvent {
    pub time: DateTime<Utc>,
    pub quota_cost: f64,
    #[serde(default)]
    pub quota_type: String,
    #[serde(default)]
    pub description: Option<String>,
    pub email: String,
    #[serde(rename = "userId", default)]
    pub user_id: String,
}

/// One day's total consumption for an account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyUsageAggregate {
    /// Day as sent by the backend: a bare date or a full timestamp
    pub date: String,
    #[serde(rename = "userId", default)]
    pub user_id: String,
    pub email: String,
    pub daily_usage: f64,
}

impl DailyUsageAggregate {
    /// Calendar day of the aggregate, when the backend value is readable
    ///
    /// Full timestamps are converted to `offset` before the date is taken, so
    /// a midnight boundary stored in UTC lands on the local day.
    pub fn day(&self, offset: &FixedOffset) -> Option<NaiveDate> {
        let raw = self.date.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.with_timezone(offset).date_naive())
            })
    }
}

/// Optional, inclusive date bounds for usage lookups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Query parameters for the bounds that are set, as `YYYY-MM-DD`
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = self.start {
            pairs.push(("startDate", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end {
            pairs.push(("endDate", end.format("%Y-%m-%d").to_string()));
        }
        pairs
    }
}
