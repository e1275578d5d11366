//! Enterprise account models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Enterprise lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnterpriseStatus {
    Active,
    Suspended,
    Expired,
}

impl EnterpriseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnterpriseStatus::Active => "ACTIVE",
            EnterpriseStatus::Suspended => "SUSPENDED",
            EnterpriseStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for EnterpriseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnterpriseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(EnterpriseStatus::Active),
            "SUSPENDED" => Ok(EnterpriseStatus::Suspended),
            "EXPIRED" => Ok(EnterpriseStatus::Expired),
            other => Err(format!(
                "unknown enterprise status '{}', expected ACTIVE, SUSPENDED or EXPIRED",
                other
            )),
        }
    }
}

/// Organizational account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enterprise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub account_quota: u64,
    #[serde(default)]
    pub used_quota: u64,
    #[serde(default)]
    pub member_usage_daily_limit: Option<u64>,
    #[serde(default)]
    pub effective_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expire_at: Option<DateTime<Utc>>,
    pub status: EnterpriseStatus,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub scale: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub members: Vec<EnterpriseMember>,
}

impl Enterprise {
    pub fn admin_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_enterprise_admin).count()
    }
}

/// Display info embedded in a membership row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberUser {
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Join entity between an enterprise and a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterpriseMember {
    pub user_id: String,
    pub user: MemberUser,
    #[serde(default)]
    pub is_enterprise_admin: bool,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub account_quota: Option<u64>,
    #[serde(default)]
    pub used_quota: Option<u64>,
    #[serde(default)]
    pub effective_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expire_at: Option<DateTime<Utc>>,
}

impl EnterpriseMember {
    pub fn email(&self) -> &str {
        &self.user.email
    }
}

/// Body of `POST /enterprise`
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnterpriseParams {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub account_quota: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_usage_daily_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_at: Option<DateTime<Utc>>,
    pub expire_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[validate(email(message = "contact email is not a valid address"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_emails: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_emails: Option<Vec<String>>,
}

impl CreateEnterpriseParams {
    pub fn new(name: impl Into<String>, account_quota: u64, expire_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            description: None,
            account_quota,
            member_usage_daily_limit: None,
            effective_at: None,
            expire_at,
            contact_person: None,
            contact_phone: None,
            contact_email: None,
            industry: None,
            scale: None,
            address: None,
            member_emails: None,
            admin_emails: None,
        }
    }
}

/// Body of `PUT /enterprise/{id}`; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEnterpriseParams {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_quota: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_usage_daily_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EnterpriseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[validate(email(message = "contact email is not a valid address"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl UpdateEnterpriseParams {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Body of `POST /enterprise/{id}/members`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddEnterpriseMembersParams {
    pub emails: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_emails: Option<Vec<String>>,
}

/// Filters for `GET /enterprise`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnterpriseListQuery {
    pub status: Option<EnterpriseStatus>,
    pub keyword: Option<String>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl EnterpriseListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: EnterpriseStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn keyword(mut self, keyword: &str) -> Self {
        self.keyword = Some(keyword.to_string());
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query string with a leading `?`, or empty when no filter is set
    ///
    /// Zero offsets/limits and blank keywords are omitted.
    pub fn to_query_string(&self) -> String {
        let mut params = vec![];
        if let Some(status) = self.status {
            params.push(format!("status={}", status.as_str()));
        }
        if let Some(ref keyword) = self.keyword {
            if !keyword.trim().is_empty() {
                params.push(format!("keyword={}", urlencoding::encode(keyword.trim())));
            }
        }
        if let Some(skip) = self.skip.filter(|s| *s > 0) {
            params.push(format!("skip={}", skip));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            params.push(format!("limit={}", limit));
        }
        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

/// Payload of `GET /enterprise`: either a bare list or a page object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EnterpriseListData {
    Page {
        #[serde(alias = "list", alias = "enterprises")]
        items: Vec<Enterprise>,
        #[serde(default)]
        total: Option<u64>,
    },
    Bare(Vec<Enterprise>),
}

impl From<EnterpriseListData> for super::api::PaginatedResponse<Enterprise> {
    fn from(data: EnterpriseListData) -> Self {
        match data {
            EnterpriseListData::Page { items, total } => Self { data: items, total },
            EnterpriseListData::Bare(items) => {
                let total = Some(items.len() as u64);
                Self { data: items, total }
            }
        }
    }
}
