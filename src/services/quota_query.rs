//! Usage query coordination
//!
//! A query runs the itemized and daily lookups concurrently and keeps the last
//! complete result in memory for export.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::models::{ApiResponse, DailyUsageAggregate, DateRange, QuotaUsageEvent};
use crate::services::backend::BackendClient;
use crate::utils::error::{AppError, AppResult, ValidationError};

/// Usage endpoints the coordinator reads from
#[async_trait]
pub trait UsageSource: Send + Sync {
    async fn quota_details(
        &self,
        email: &str,
        range: &DateRange,
    ) -> AppResult<ApiResponse<Vec<QuotaUsageEvent>>>;

    async fn daily_quota(
        &self,
        email: &str,
        range: &DateRange,
    ) -> AppResult<ApiResponse<Vec<DailyUsageAggregate>>>;
}

#[async_trait]
impl UsageSource for BackendClient {
    async fn quota_details(
        &self,
        email: &str,
        range: &DateRange,
    ) -> AppResult<ApiResponse<Vec<QuotaUsageEvent>>> {
        self.fetch_quota_details(email, range).await
    }

    async fn daily_quota(
        &self,
        email: &str,
        range: &DateRange,
    ) -> AppResult<ApiResponse<Vec<DailyUsageAggregate>>> {
        self.fetch_daily_quota(email, range).await
    }
}

#[async_trait]
impl<S: UsageSource + ?Sized> UsageSource for Arc<S> {
    async fn quota_details(
        &self,
        email: &str,
        range: &DateRange,
    ) -> AppResult<ApiResponse<Vec<QuotaUsageEvent>>> {
        self.as_ref().quota_details(email, range).await
    }

    async fn daily_quota(
        &self,
        email: &str,
        range: &DateRange,
    ) -> AppResult<ApiResponse<Vec<DailyUsageAggregate>>> {
        self.as_ref().daily_quota(email, range).await
    }
}

/// Which half of a query came back empty because its request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageSlot {
    Events,
    Daily,
}

/// Combined outcome of one usage query
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub email: String,
    pub range: DateRange,
    pub events: Vec<QuotaUsageEvent>,
    pub daily: Vec<DailyUsageAggregate>,
    /// Slots left empty by a transport failure rather than a backend verdict
    pub degraded: Vec<UsageSlot>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.daily.is_empty()
    }

    pub fn total_cost(&self) -> f64 {
        self.events.iter().map(|e| e.quota_cost).sum()
    }
}

/// Runs usage queries and holds the latest result
pub struct QuotaQueryCoordinator<S> {
    source: S,
    current: Option<QueryResult>,
}

impl<S: UsageSource> QuotaQueryCoordinator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: None,
        }
    }

    /// Last successfully completed query
    pub fn current(&self) -> Option<&QueryResult> {
        self.current.as_ref()
    }

    /// Query both usage views for `email`
    ///
    /// Each slot is filled only when its own response carries the success
    /// sentinel. When both requests fail at transport level the query fails as a
    /// whole and the previously held result stays in place.
    pub async fn query(&mut self, email: &str, range: DateRange) -> AppResult<&QueryResult> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AppError::Validation(ValidationError::InvalidField(
                "an email address is required to query usage".to_string(),
            )));
        }

        debug!(email = %email, ?range, "Querying quota usage");
        let (details, daily) = futures::join!(
            self.source.quota_details(email, &range),
            self.source.daily_quota(email, &range)
        );

        if let (Err(details_err), Err(daily_err)) = (&details, &daily) {
            warn!(
                details = %details_err,
                daily = %daily_err,
                "Both usage lookups failed, keeping previous result"
            );
            return Err(AppError::Transport(format!(
                "details: {}; daily: {}",
                details_err, daily_err
            )));
        }

        let mut degraded = Vec::new();
        let events = fill_slot(details, UsageSlot::Events, &mut degraded);
        let daily = fill_slot(daily, UsageSlot::Daily, &mut degraded);

        info!(
            email = %email,
            events = events.len(),
            days = daily.len(),
            "Quota usage query completed"
        );

        let result = QueryResult {
            email: email.to_string(),
            range,
            events,
            daily,
            degraded,
        };
        Ok(self.current.insert(result))
    }
}

fn fill_slot<T>(
    response: AppResult<ApiResponse<Vec<T>>>,
    slot: UsageSlot,
    degraded: &mut Vec<UsageSlot>,
) -> Vec<T> {
    match response {
        Ok(envelope) if envelope.is_success() => envelope.data.unwrap_or_default(),
        Ok(envelope) => {
            debug!(
                ?slot,
                status_code = envelope.status_code,
                message = ?envelope.message,
                "Usage lookup rejected, leaving slot empty"
            );
            Vec::new()
        }
        Err(err) => {
            warn!(?slot, error = %err, "Usage lookup failed, leaving slot empty");
            degraded.push(slot);
            Vec::new()
        }
    }
}
