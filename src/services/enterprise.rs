//! Enterprise roster management
//!
//! The roster engine decides which member and admin addresses may be sent when
//! creating an enterprise or extending its membership. Any invalid entry aborts
//! the whole batch. [`EnterpriseService`] wires the engine to the backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use validator::Validate;

use crate::config::MembershipConfig;
use crate::models::{
    AddEnterpriseMembersParams, CreateEnterpriseParams, Enterprise, EnterpriseListQuery,
    EnterpriseMember, PaginatedResponse, UpdateEnterpriseParams,
};
use crate::services::backend::BackendClient;
use crate::services::directory::EmailDirectory;
use crate::services::email_validation::{EmailPartition, EmailValidator};
use crate::utils::error::{AppError, AppResult, EmailIssue, EmailIssues, ValidationError};
use crate::utils::validation::validate_resource_id;

/// Roster change being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterOperation {
    /// Initial roster of a new enterprise; may be empty
    Create,
    /// Extension of an existing roster; existing members are rejected
    AddMembers,
}

/// Member and admin lists as the operator is editing them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDraft {
    members: Vec<String>,
    admins: Vec<String>,
}

impl RosterDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(members: &[String], admins: &[String]) -> Self {
        let mut draft = Self::new();
        draft.set_members(members);
        draft.set_admins(admins);
        draft
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn admins(&self) -> &[String] {
        &self.admins
    }

    pub fn set_members(&mut self, members: &[String]) {
        self.members.clear();
        for email in members {
            push_unique(&mut self.members, email);
        }
        // admins that are no longer members lose their role
        let members = &self.members;
        self.admins.retain(|admin| members.contains(admin));
    }

    /// Replace the admin list; every admin is also made a member
    pub fn set_admins(&mut self, admins: &[String]) {
        self.admins.clear();
        for email in admins {
            push_unique(&mut self.admins, email);
            push_unique(&mut self.members, email);
        }
    }

    pub fn add_member(&mut self, email: &str) {
        push_unique(&mut self.members, email);
    }

    pub fn remove_member(&mut self, email: &str) {
        self.members.retain(|m| m != email);
        self.admins.retain(|a| a != email);
    }

    /// Union of members and admins, in first-seen order
    pub fn candidates(&self) -> Vec<String> {
        let mut all = Vec::with_capacity(self.members.len() + self.admins.len());
        for email in self.members.iter().chain(&self.admins) {
            push_unique(&mut all, email);
        }
        all
    }
}

fn push_unique(list: &mut Vec<String>, email: &str) {
    let email = email.trim();
    if !email.is_empty() && !list.iter().any(|e| e == email) {
        list.push(email.to_string());
    }
}

/// Roster that passed every check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciledRoster {
    /// Always a superset of `valid_admins`
    pub valid_members: Vec<String>,
    pub valid_admins: Vec<String>,
}

/// Backend registration lookup used before submitting a roster
#[async_trait]
pub trait MembershipVerifier: Send + Sync {
    /// Addresses among `emails` the backend does not know
    async fn unregistered(&self, emails: &[String]) -> AppResult<Vec<String>>;
}

#[async_trait]
impl MembershipVerifier for BackendClient {
    async fn unregistered(&self, emails: &[String]) -> AppResult<Vec<String>> {
        let info = self.fetch_members_info(emails).await?.into_data()?;
        Ok(info.stats.not_found_emails)
    }
}

/// Validates roster drafts against the directory and existing members
pub struct EnterpriseRosterEngine<'a> {
    directory: &'a EmailDirectory,
    existing: &'a [EnterpriseMember],
    operation: RosterOperation,
}

impl<'a> EnterpriseRosterEngine<'a> {
    pub fn new(
        directory: &'a EmailDirectory,
        existing: &'a [EnterpriseMember],
        operation: RosterOperation,
    ) -> Self {
        Self {
            directory,
            existing,
            operation,
        }
    }

    /// Current valid/invalid split of a draft, for live feedback
    pub fn partition(&self, draft: &RosterDraft) -> EmailPartition {
        let mut partition = EmailValidator::new(self.directory).validate(draft.candidates());

        if self.operation == RosterOperation::AddMembers {
            let duplicates: Vec<String> = partition
                .valid
                .iter()
                .filter(|email| self.is_existing(email))
                .cloned()
                .collect();
            for email in duplicates {
                partition.valid.remove(&email);
                partition.invalid.insert(email.clone());
                partition.issues.record(EmailIssue::Duplicate, email);
            }
        }

        partition
    }

    /// Validate a full batch; any invalid entry rejects all of it
    pub fn reconcile(
        &self,
        member_emails: &[String],
        admin_emails: &[String],
    ) -> Result<ReconciledRoster, ValidationError> {
        let draft = RosterDraft::with(member_emails, admin_emails);

        if draft.members().is_empty() {
            return match self.operation {
                RosterOperation::Create => Ok(ReconciledRoster::default()),
                RosterOperation::AddMembers => Err(ValidationError::EmptyEmailSet),
            };
        }

        let partition = self.partition(&draft);
        if !partition.is_clean() {
            return Err(ValidationError::InvalidEmailSet(partition.issues));
        }

        debug!(
            members = draft.members().len(),
            admins = draft.admins().len(),
            "Roster reconciled"
        );
        Ok(ReconciledRoster {
            valid_members: draft.members().to_vec(),
            valid_admins: draft.admins().to_vec(),
        })
    }

    /// [`reconcile`](Self::reconcile) followed by a backend registration check
    ///
    /// A failed lookup is reported as `VerificationUnavailable`, never as an
    /// invalid address.
    pub async fn reconcile_verified<V: MembershipVerifier + ?Sized>(
        &self,
        verifier: &V,
        member_emails: &[String],
        admin_emails: &[String],
    ) -> Result<ReconciledRoster, ValidationError> {
        let roster = self.reconcile(member_emails, admin_emails)?;
        if roster.valid_members.is_empty() {
            return Ok(roster);
        }

        let unregistered = verifier
            .unregistered(&roster.valid_members)
            .await
            .map_err(|err| {
                warn!(error = %err, "Registration lookup failed");
                ValidationError::VerificationUnavailable(err.user_message())
            })?;

        if unregistered.is_empty() {
            return Ok(roster);
        }

        let mut issues = EmailIssues::default();
        for email in unregistered {
            issues.record(EmailIssue::Unknown, email);
        }
        Err(ValidationError::InvalidEmailSet(issues))
    }

    fn is_existing(&self, email: &str) -> bool {
        self.existing.iter().any(|m| m.email() == email)
    }
}

fn check_window(
    settings: &MembershipConfig,
    effective_at: Option<DateTime<Utc>>,
    expire_at: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    if !settings.enforce_window_order {
        return Ok(());
    }
    match (effective_at, expire_at) {
        (Some(start), Some(end)) if start >= end => Err(ValidationError::InvalidWindow {
            effective_at: start.to_rfc3339(),
            expire_at: end.to_rfc3339(),
        }),
        _ => Ok(()),
    }
}

fn check_id(id: &str) -> AppResult<()> {
    if validate_resource_id(id) {
        Ok(())
    } else {
        Err(AppError::Validation(ValidationError::InvalidField(format!(
            "'{}' is not a valid identifier",
            id
        ))))
    }
}

/// Enterprise operations against the backend
///
/// Roster-changing operations take the directory snapshot they validate against.
pub struct EnterpriseService<'a> {
    client: &'a BackendClient,
    settings: &'a MembershipConfig,
}

impl<'a> EnterpriseService<'a> {
    pub fn new(client: &'a BackendClient, settings: &'a MembershipConfig) -> Self {
        Self { client, settings }
    }

    /// Create an enterprise with an optional initial roster
    pub async fn create(
        &self,
        directory: &EmailDirectory,
        mut params: CreateEnterpriseParams,
        draft: &RosterDraft,
    ) -> AppResult<Option<String>> {
        params.validate()?;
        check_window(self.settings, params.effective_at, Some(params.expire_at))?;

        let engine = EnterpriseRosterEngine::new(directory, &[], RosterOperation::Create);
        let roster = engine
            .reconcile_verified(self.client, draft.members(), draft.admins())
            .await?;

        params.member_emails = Some(roster.valid_members).filter(|m| !m.is_empty());
        params.admin_emails = Some(roster.valid_admins).filter(|a| !a.is_empty());

        info!(name = %params.name, "Creating enterprise");
        self.client.create_enterprise(&params).await?.into_message()
    }

    pub async fn update(&self, id: &str, params: &UpdateEnterpriseParams) -> AppResult<Option<String>> {
        check_id(id)?;
        if params.is_empty() {
            return Err(AppError::Validation(ValidationError::InvalidField(
                "no fields to update".to_string(),
            )));
        }
        params.validate()?;
        check_window(self.settings, params.effective_at, params.expire_at)?;

        info!(enterprise = %id, "Updating enterprise");
        self.client.update_enterprise(id, params).await?.into_message()
    }

    pub async fn get(&self, id: &str) -> AppResult<Enterprise> {
        check_id(id)?;
        self.client.get_enterprise(id).await?.into_data()
    }

    pub async fn list(&self, query: &EnterpriseListQuery) -> AppResult<PaginatedResponse<Enterprise>> {
        let data = self.client.list_enterprises(query).await?.into_data()?;
        Ok(data.into())
    }

    /// Add members to an existing enterprise
    ///
    /// The current roster is fetched first so that existing members are
    /// rejected rather than silently re-added.
    pub async fn add_members(
        &self,
        directory: &EmailDirectory,
        id: &str,
        member_emails: &[String],
        admin_emails: &[String],
    ) -> AppResult<Option<String>> {
        let enterprise = self.get(id).await?;

        let engine = EnterpriseRosterEngine::new(
            directory,
            &enterprise.members,
            RosterOperation::AddMembers,
        );
        let roster = engine
            .reconcile_verified(self.client, member_emails, admin_emails)
            .await?;

        let params = AddEnterpriseMembersParams {
            emails: roster.valid_members,
            admin_emails: Some(roster.valid_admins).filter(|a| !a.is_empty()),
        };

        info!(enterprise = %id, count = params.emails.len(), "Adding enterprise members");
        self.client
            .add_enterprise_members(id, &params)
            .await?
            .into_message()
    }

    pub async fn remove_member(&self, id: &str, user_id: &str) -> AppResult<Option<String>> {
        check_id(id)?;
        check_id(user_id)?;

        info!(enterprise = %id, user = %user_id, "Removing enterprise member");
        self.client
            .remove_enterprise_member(id, user_id)
            .await?
            .into_message()
    }
}
