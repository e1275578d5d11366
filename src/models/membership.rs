//! Individual membership models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard grant sizes offered to operators
pub const QUOTA_PRESETS: [u64; 6] = [30, 100, 200, 500, 1000, 10000];

/// Membership tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberType {
    Free,
    #[default]
    Paid,
}

impl MemberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberType::Free => "FREE",
            MemberType::Paid => "PAID",
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FREE" => Ok(MemberType::Free),
            "PAID" => Ok(MemberType::Paid),
            other => Err(format!("unknown member type '{}', expected FREE or PAID", other)),
        }
    }
}

/// Membership status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberStatus {
    Active,
    Suspended,
}

impl FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(MemberStatus::Active),
            "SUSPENDED" => Ok(MemberStatus::Suspended),
            other => Err(format!(
                "unknown member status '{}', expected ACTIVE or SUSPENDED",
                other
            )),
        }
    }
}

/// One user's active quota grant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipWindow {
    #[serde(rename = "type")]
    pub member_type: MemberType,
    pub status: MemberStatus,
    pub account_quota: u64,
    /// May exceed `account_quota`; never clamped
    pub used_quota: u64,
    pub effective_at: Option<DateTime<Utc>>,
    pub expire_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MembershipWindow {
    pub fn available_quota(&self) -> i64 {
        available(self.account_quota, self.used_quota)
    }
}

fn available(account: u64, used: u64) -> i64 {
    account as i64 - used as i64
}

/// Partial update of a membership window; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MembershipPatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub member_type: Option<MemberType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_quota: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MemberStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_quota: Option<u64>,
}

/// Validated command sent to `POST /userMember/admin`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MembershipMutationRequest {
    pub emails: Vec<String>,
    pub params: MembershipPatch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Row of the members-by-tier listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub user_id: String,
    pub email: String,
    pub effective_at: Option<DateTime<Utc>>,
    pub expire_at: Option<DateTime<Utc>>,
    pub account_quota: u64,
    pub used_quota: u64,
    pub created_at: Option<DateTime<Utc>>,
}

impl MemberInfo {
    /// Remaining quota; negative when consumption exceeds the grant
    pub fn available_quota(&self) -> i64 {
        available(self.account_quota, self.used_quota)
    }
}

/// Profile returned by the selected-members lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub membership: Option<MembershipWindow>,
}

/// Outcome counts of a registration lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupStats {
    pub total: u64,
    pub found: u64,
    pub not_found: u64,
    #[serde(default)]
    pub not_found_emails: Vec<String>,
}

/// Payload of `POST /userMember/members-info`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembersInfo {
    #[serde(default)]
    pub users: Vec<MemberProfile>,
    #[serde(default)]
    pub stats: LookupStats,
}
