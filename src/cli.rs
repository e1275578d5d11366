//! Command-line parsing
//!
//! Date-time arguments stay as text until the configuration (and its local UTC
//! offset) is known.

use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use clap::{Args, CommandFactory, FromArgMatches, Parser, Subcommand};

use crate::models::{
    CreateEnterpriseParams, DateRange, EnterpriseListQuery, EnterpriseStatus, MemberStatus,
    MemberType, UpdateEnterpriseParams, QUOTA_PRESETS,
};
use crate::services::membership::{parse_form_datetime, RawMembershipForm};
use crate::utils::error::ValidationError;
use crate::utils::validation::parse_query_date;

const ENVIRONMENT_HELP: &str = "\
DATETIME is RFC 3339 (2024-12-31T23:59:00+08:00) or \"YYYY-MM-DD HH:MM[:SS]\",
which is read at the configured local UTC offset.

Environment:
  QUOTA_CONSOLE_CONFIG      Path to configuration file
  QUOTA_CONSOLE_API_URL     Backend base URL
  QUOTA_CONSOLE_TOKEN       Bearer token sent with every request
  QUOTA_CONSOLE_EXPORT_DIR  Directory exported workbooks are written to
  RUST_LOG                  Log filter (default: warn)

Configuration files are searched in order: --config, QUOTA_CONSOLE_CONFIG,
./quota-console.yaml, ./config/quota-console.yaml,
/etc/quota-console/config.yaml, ~/.config/quota-console/config.yaml";

/// Administration console for membership quotas and enterprise rosters
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "quota-console", version)]
pub struct Cli {
    /// Configuration file to load
    #[arg(short, long = "config", global = true, value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List registered emails, optionally filtered
    Emails {
        #[arg(long, value_name = "TEXT")]
        search: Option<String>,
    },
    /// List members of one tier
    Members {
        #[arg(long = "type", default_value = "PAID", value_parser = MemberType::from_str)]
        member_type: MemberType,
    },
    /// Show profile and membership of selected users
    MembersInfo {
        #[arg(required = true, value_delimiter = ',', value_parser = email_entry)]
        emails: Vec<String>,
    },
    /// Create or update memberships
    Grant(GrantArgs),
    /// Show quota usage, optionally exporting a workbook
    Query(QueryArgs),
    /// Manage enterprise accounts and their rosters
    Enterprise {
        #[command(subcommand)]
        command: EnterpriseCommand,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum EnterpriseCommand {
    /// List enterprises
    List(ListArgs),
    /// Show one enterprise with its roster
    Show { id: String },
    /// Create an enterprise (requires --name, --quota and --expire)
    Create {
        #[command(flatten)]
        fields: EnterpriseFields,
        /// Member emails, comma separated
        #[arg(long, value_delimiter = ',', value_parser = email_entry)]
        members: Vec<String>,
        /// Admin emails, comma separated
        #[arg(long, value_delimiter = ',', value_parser = email_entry)]
        admins: Vec<String>,
    },
    /// Update enterprise attributes
    Update {
        id: String,
        #[command(flatten)]
        fields: EnterpriseFields,
        #[arg(long, value_parser = EnterpriseStatus::from_str)]
        status: Option<EnterpriseStatus>,
    },
    /// Add members and admins to an existing enterprise
    AddMembers {
        id: String,
        #[arg(long, required = true, value_delimiter = ',', value_parser = email_entry)]
        members: Vec<String>,
        #[arg(long, value_delimiter = ',', value_parser = email_entry)]
        admins: Vec<String>,
    },
    /// Remove one member by user ID
    RemoveMember { id: String, user_id: String },
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct GrantArgs {
    /// Account emails, comma separated
    #[arg(long, required = true, value_delimiter = ',', value_parser = email_entry)]
    pub emails: Vec<String>,
    #[arg(long = "type", value_parser = MemberType::from_str)]
    pub member_type: Option<MemberType>,
    #[arg(long, value_parser = MemberStatus::from_str)]
    pub status: Option<MemberStatus>,
    /// Total quota to grant
    #[arg(long)]
    pub quota: Option<u64>,
    /// Quota already consumed
    #[arg(long)]
    pub used: Option<u64>,
    #[arg(long, value_name = "DATETIME")]
    pub effective: Option<String>,
    #[arg(long, value_name = "DATETIME")]
    pub expire: Option<String>,
    #[arg(long)]
    pub timezone: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

impl GrantArgs {
    /// Convert to a form, reading offset-less date-times at `local_offset_hours`
    pub fn into_form(self, local_offset_hours: i32) -> Result<RawMembershipForm, ValidationError> {
        Ok(RawMembershipForm {
            emails: self.emails,
            member_type: self.member_type,
            status: self.status,
            account_quota: self.quota,
            used_quota: self.used,
            effective_at: self
                .effective
                .as_deref()
                .map(|v| parse_form_datetime(v, local_offset_hours))
                .transpose()?,
            expire_at: self
                .expire
                .as_deref()
                .map(|v| parse_form_datetime(v, local_offset_hours))
                .transpose()?,
            timezone: self.timezone,
            description: self.description,
        })
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct QueryArgs {
    #[arg(long)]
    pub email: String,
    /// First day, inclusive
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = query_date)]
    pub start: Option<NaiveDate>,
    /// Last day, inclusive
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = query_date)]
    pub end: Option<NaiveDate>,
    /// Write the result to an XLSX workbook
    #[arg(long)]
    pub export: bool,
}

impl QueryArgs {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ListArgs {
    #[arg(long, value_parser = EnterpriseStatus::from_str)]
    pub status: Option<EnterpriseStatus>,
    #[arg(long)]
    pub keyword: Option<String>,
    #[arg(long)]
    pub skip: Option<u32>,
    #[arg(long)]
    pub limit: Option<u32>,
}

impl ListArgs {
    pub fn to_query(&self) -> EnterpriseListQuery {
        let mut query = EnterpriseListQuery::new();
        if let Some(status) = self.status {
            query = query.status(status);
        }
        if let Some(ref keyword) = self.keyword {
            query = query.keyword(keyword);
        }
        if let Some(skip) = self.skip {
            query = query.skip(skip);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        query
    }
}

/// Enterprise attributes shared by `create` and `update`
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct EnterpriseFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Total account quota
    #[arg(long)]
    pub quota: Option<u64>,
    /// Daily usage cap per member
    #[arg(long)]
    pub daily_limit: Option<u64>,
    #[arg(long, value_name = "DATETIME")]
    pub effective: Option<String>,
    #[arg(long, value_name = "DATETIME")]
    pub expire: Option<String>,
    #[arg(long)]
    pub contact_person: Option<String>,
    #[arg(long)]
    pub contact_phone: Option<String>,
    #[arg(long)]
    pub contact_email: Option<String>,
    #[arg(long)]
    pub industry: Option<String>,
    #[arg(long)]
    pub scale: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
}

fn utc_time(
    value: Option<&str>,
    local_offset_hours: i32,
) -> Result<Option<chrono::DateTime<Utc>>, ValidationError> {
    value
        .map(|v| parse_form_datetime(v, local_offset_hours).map(|dt| dt.with_timezone(&Utc)))
        .transpose()
}

impl EnterpriseFields {
    pub fn into_create_params(
        self,
        local_offset_hours: i32,
    ) -> Result<CreateEnterpriseParams, ValidationError> {
        let name = self
            .name
            .ok_or_else(|| ValidationError::InvalidField("--name is required".to_string()))?;
        let quota = self
            .quota
            .ok_or_else(|| ValidationError::InvalidField("--quota is required".to_string()))?;
        let expire_at = utc_time(self.expire.as_deref(), local_offset_hours)?
            .ok_or_else(|| ValidationError::InvalidField("--expire is required".to_string()))?;

        let mut params = CreateEnterpriseParams::new(name, quota, expire_at);
        params.description = self.description;
        params.member_usage_daily_limit = self.daily_limit;
        params.effective_at = utc_time(self.effective.as_deref(), local_offset_hours)?;
        params.contact_person = self.contact_person;
        params.contact_phone = self.contact_phone;
        params.contact_email = self.contact_email;
        params.industry = self.industry;
        params.scale = self.scale;
        params.address = self.address;
        Ok(params)
    }

    pub fn into_update_params(
        self,
        status: Option<EnterpriseStatus>,
        local_offset_hours: i32,
    ) -> Result<UpdateEnterpriseParams, ValidationError> {
        Ok(UpdateEnterpriseParams {
            name: self.name,
            description: self.description,
            account_quota: self.quota,
            member_usage_daily_limit: self.daily_limit,
            effective_at: utc_time(self.effective.as_deref(), local_offset_hours)?,
            expire_at: utc_time(self.expire.as_deref(), local_offset_hours)?,
            status,
            contact_person: self.contact_person,
            contact_phone: self.contact_phone,
            contact_email: self.contact_email,
            industry: self.industry,
            scale: self.scale,
            address: self.address,
        })
    }
}

/// One entry of a comma separated email list
fn email_entry(value: &str) -> Result<String, String> {
    match value.trim() {
        "" => Err("empty entry in email list".to_string()),
        trimmed => Ok(trimmed.to_string()),
    }
}

fn query_date(value: &str) -> Result<NaiveDate, String> {
    parse_query_date(value).ok_or_else(|| format!("expected YYYY-MM-DD, got '{}'", value))
}

/// Command definition with the quota presets appended to the help text
pub fn command() -> clap::Command {
    let presets = QUOTA_PRESETS
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Cli::command().after_help(format!(
        "Standard quota sizes: {}\n\n{}",
        presets, ENVIRONMENT_HELP
    ))
}

/// Parse the process arguments, exiting with usage on error
pub fn parse() -> Cli {
    let matches = command().get_matches();
    Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

/// Parse `args`, including the program name
pub fn try_parse_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    Cli::from_arg_matches(&matches)
}
