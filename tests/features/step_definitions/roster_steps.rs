//! Enterprise roster step definitions

use cucumber::{given, then, when};

use quota_console::models::{EnterpriseMember, MemberUser};
use quota_console::services::{EnterpriseRosterEngine, RosterOperation};
use quota_console::utils::error::ValidationError;

use super::common_steps::split_list;
use crate::features::support::TestWorld;

fn member(email: &str) -> EnterpriseMember {
    EnterpriseMember {
        user_id: format!("id-{}", email),
        user: MemberUser {
            email: email.to_string(),
            avatar: None,
        },
        is_enterprise_admin: false,
        timezone: None,
        account_quota: None,
        used_quota: None,
        effective_at: None,
        expire_at: None,
    }
}

#[given("I am creating an enterprise")]
async fn creating_enterprise(world: &mut TestWorld) {
    world.operation = Some(RosterOperation::Create);
}

#[given(expr = "I am adding members to an enterprise whose members are {string}")]
async fn adding_members(world: &mut TestWorld, members: String) {
    world.operation = Some(RosterOperation::AddMembers);
    world.existing = split_list(&members).iter().map(|e| member(e)).collect();
}

#[when(expr = "I add the member {string}")]
async fn add_member(world: &mut TestWorld, email: String) {
    world.draft.add_member(&email);
}

#[when(expr = "I set the admins to {string}")]
async fn set_admins(world: &mut TestWorld, admins: String) {
    world.draft.set_admins(&split_list(&admins));
}

#[when(expr = "I set the members to {string}")]
async fn set_members(world: &mut TestWorld, members: String) {
    world.draft.set_members(&split_list(&members));
}

#[when(expr = "I remove the member {string}")]
async fn remove_member(world: &mut TestWorld, email: String) {
    world.draft.remove_member(&email);
}

#[when("I review the roster")]
async fn review_roster(world: &mut TestWorld) {
    let directory = world.directory();
    let engine = EnterpriseRosterEngine::new(&directory, &world.existing, world.operation());
    world.partition = Some(engine.partition(&world.draft));
}

#[when("I submit the roster")]
async fn submit_roster(world: &mut TestWorld) {
    let directory = world.directory();
    let engine = EnterpriseRosterEngine::new(&directory, &world.existing, world.operation());
    world.roster = Some(engine.reconcile(world.draft.members(), world.draft.admins()));
}

#[then(expr = "the draft members are {string}")]
async fn draft_members_are(world: &mut TestWorld, members: String) {
    assert_eq!(world.draft.members(), split_list(&members).as_slice());
}

#[then(expr = "the draft admins are {string}")]
async fn draft_admins_are(world: &mut TestWorld, admins: String) {
    assert_eq!(world.draft.admins(), split_list(&admins).as_slice());
}

#[then("the draft has no admins")]
async fn draft_has_no_admins(world: &mut TestWorld) {
    assert!(world.draft.admins().is_empty());
}

#[then("the roster is clean")]
async fn roster_is_clean(world: &mut TestWorld) {
    let partition = world.partition.as_ref().expect("roster was not reviewed");
    assert!(partition.is_clean(), "unexpected issues: {}", partition.issues);
}

#[then(expr = "the roster flags {string}")]
async fn roster_flags(world: &mut TestWorld, emails: String) {
    let partition = world.partition.as_ref().expect("roster was not reviewed");
    for email in split_list(&emails) {
        assert!(partition.invalid.contains(&email), "{} was not flagged", email);
        assert!(!partition.valid.contains(&email));
    }
}

#[then(expr = "the roster is accepted with members {string} and admins {string}")]
async fn roster_accepted(world: &mut TestWorld, members: String, admins: String) {
    match world.roster.as_ref().expect("roster was not submitted") {
        Ok(roster) => {
            assert_eq!(roster.valid_members, split_list(&members));
            assert_eq!(roster.valid_admins, split_list(&admins));
        }
        Err(err) => panic!("roster rejected: {}", err),
    }
}

#[then(expr = "the roster is rejected listing {string}")]
async fn roster_rejected(world: &mut TestWorld, emails: String) {
    let err = world.last_error().expect("roster was accepted");
    let invalid: Vec<String> = err.invalid_emails().into_iter().collect();
    let mut expected = split_list(&emails);
    expected.sort();
    assert_eq!(invalid, expected);
}

#[then(expr = "{string} is reported as an existing member")]
async fn reported_as_existing(world: &mut TestWorld, email: String) {
    match world.last_error() {
        Some(ValidationError::InvalidEmailSet(issues)) => {
            assert!(issues.duplicates.contains(&email))
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[then("the roster is rejected because it is empty")]
async fn roster_rejected_empty(world: &mut TestWorld) {
    assert_eq!(world.last_error(), Some(&ValidationError::EmptyEmailSet));
}
