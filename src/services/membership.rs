//! Individual membership workflow
//!
//! Turns an operator's raw form into a validated [`MembershipMutationRequest`],
//! submits it, and interprets the backend verdict. Building never touches the
//! network; a failed build transmits nothing.

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::{info, warn};

use crate::config::MembershipConfig;
use crate::models::{
    ApiResponse, MemberInfo, MemberStatus, MemberType, MembersInfo, MembershipMutationRequest,
    MembershipPatch,
};
use crate::services::backend::BackendClient;
use crate::services::directory::EmailDirectory;
use crate::services::email_validation::EmailValidator;
use crate::utils::error::{AppError, AppResult, ValidationError};

/// Unvalidated operator input for a membership mutation
#[derive(Debug, Clone, Default)]
pub struct RawMembershipForm {
    pub emails: Vec<String>,
    pub member_type: Option<MemberType>,
    pub status: Option<MemberStatus>,
    pub account_quota: Option<u64>,
    pub used_quota: Option<u64>,
    /// Local date-times as typed, each carrying its offset
    pub effective_at: Option<DateTime<FixedOffset>>,
    pub expire_at: Option<DateTime<FixedOffset>>,
    pub timezone: Option<String>,
    pub description: Option<String>,
}

/// Move a form date-time forward by the backend convention and normalize to UTC
pub fn shift_timestamp(value: DateTime<FixedOffset>, hours: i64) -> DateTime<Utc> {
    (value + Duration::hours(hours)).with_timezone(&Utc)
}

/// Parse an operator-entered date-time
///
/// Accepts RFC 3339, or `YYYY-MM-DD HH:MM[:SS]` interpreted at
/// `local_offset_hours` east of UTC.
pub fn parse_form_datetime(
    value: &str,
    local_offset_hours: i32,
) -> Result<DateTime<FixedOffset>, ValidationError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt);
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M"))
        .map_err(|_| {
            ValidationError::InvalidField(format!(
                "'{}' is not a date-time (expected RFC 3339 or YYYY-MM-DD HH:MM[:SS])",
                value
            ))
        })?;

    let offset = FixedOffset::east_opt(local_offset_hours * 3600).ok_or_else(|| {
        ValidationError::InvalidField(format!("invalid UTC offset {}h", local_offset_hours))
    })?;

    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| ValidationError::InvalidField(format!("ambiguous date-time '{}'", value)))
}

/// Builds mutation requests against a directory snapshot
pub struct MembershipMutationBuilder<'a> {
    directory: &'a EmailDirectory,
    settings: &'a MembershipConfig,
}

impl<'a> MembershipMutationBuilder<'a> {
    pub fn new(directory: &'a EmailDirectory, settings: &'a MembershipConfig) -> Self {
        Self {
            directory,
            settings,
        }
    }

    pub fn build(
        &self,
        form: &RawMembershipForm,
    ) -> Result<MembershipMutationRequest, ValidationError> {
        let mut emails: Vec<String> = Vec::new();
        for email in form.emails.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
            if !emails.iter().any(|seen| seen == email) {
                emails.push(email.to_string());
            }
        }
        if emails.is_empty() {
            return Err(ValidationError::EmptyEmailSet);
        }

        let partition = EmailValidator::new(self.directory).validate(&emails);
        if !partition.is_clean() {
            return Err(ValidationError::InvalidEmailSet(partition.issues));
        }

        let shift = self.settings.timestamp_shift_hours;
        let effective_at = form.effective_at.map(|dt| shift_timestamp(dt, shift));
        let expire_at = form.expire_at.map(|dt| shift_timestamp(dt, shift));

        if self.settings.enforce_window_order {
            if let (Some(start), Some(end)) = (effective_at, expire_at) {
                if start >= end {
                    return Err(ValidationError::InvalidWindow {
                        effective_at: start.to_rfc3339(),
                        expire_at: end.to_rfc3339(),
                    });
                }
            }
        }

        let params = MembershipPatch {
            member_type: form.member_type,
            effective_at,
            expire_at,
            account_quota: form.account_quota,
            timezone: non_blank(form.timezone.as_deref()),
            status: form.status,
            used_quota: form.used_quota,
        };

        Ok(MembershipMutationRequest {
            emails,
            params,
            description: non_blank(form.description.as_deref()),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Operator-facing verdict of a submitted mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Succeeded { message: Option<String> },
    Failed { message: String, retryable: bool },
}

impl MutationOutcome {
    pub fn from_result(result: AppResult<Option<String>>) -> Self {
        match result {
            Ok(message) => MutationOutcome::Succeeded { message },
            Err(err) => MutationOutcome::Failed {
                retryable: err.is_retryable(),
                message: err.user_message(),
            },
        }
    }

    /// The form is cleared only on confirmed success
    pub fn resets_form(&self) -> bool {
        matches!(self, MutationOutcome::Succeeded { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            MutationOutcome::Succeeded { message } => {
                message.as_deref().unwrap_or("Membership updated")
            }
            MutationOutcome::Failed { message, .. } => message,
        }
    }
}

/// Membership endpoints the workflow depends on
#[async_trait]
pub trait MembershipGateway: Send + Sync {
    async fn update_membership(
        &self,
        request: &MembershipMutationRequest,
    ) -> AppResult<ApiResponse<serde_json::Value>>;

    async fn fetch_members(&self, member_type: MemberType) -> AppResult<ApiResponse<Vec<MemberInfo>>>;

    async fn fetch_members_info(&self, emails: &[String]) -> AppResult<ApiResponse<MembersInfo>>;
}

#[async_trait]
impl MembershipGateway for BackendClient {
    async fn update_membership(
        &self,
        request: &MembershipMutationRequest,
    ) -> AppResult<ApiResponse<serde_json::Value>> {
        BackendClient::update_membership(self, request).await
    }

    async fn fetch_members(&self, member_type: MemberType) -> AppResult<ApiResponse<Vec<MemberInfo>>> {
        BackendClient::fetch_members(self, member_type).await
    }

    async fn fetch_members_info(&self, emails: &[String]) -> AppResult<ApiResponse<MembersInfo>> {
        BackendClient::fetch_members_info(self, emails).await
    }
}

/// Send a built request and interpret the verdict
pub async fn submit<G: MembershipGateway + ?Sized>(
    gateway: &G,
    request: &MembershipMutationRequest,
) -> MutationOutcome {
    let result = match gateway.update_membership(request).await {
        Ok(response) => response.into_message(),
        Err(err) => Err(err),
    };

    match &result {
        Ok(_) => info!(count = request.emails.len(), "Membership mutation accepted"),
        Err(err) => warn!(error = %err, "Membership mutation failed"),
    }

    MutationOutcome::from_result(result)
}

/// Members of one tier
pub async fn list_members<G: MembershipGateway + ?Sized>(
    gateway: &G,
    member_type: MemberType,
) -> AppResult<Vec<MemberInfo>> {
    gateway.fetch_members(member_type).await?.into_data()
}

/// Profiles and registration stats for selected addresses
pub async fn lookup_members<G: MembershipGateway + ?Sized>(
    gateway: &G,
    emails: &[String],
) -> AppResult<MembersInfo> {
    if emails.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyEmailSet));
    }
    gateway.fetch_members_info(emails).await?.into_data()
}
