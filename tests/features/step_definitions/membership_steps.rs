//! Membership form step definitions

use chrono::{DateTime, Utc};
use cucumber::{given, then, when};

use quota_console::models::{ApiResponse, MemberType};
use quota_console::services::membership::parse_form_datetime;
use quota_console::services::{MembershipMutationBuilder, MutationOutcome, RawMembershipForm};
use quota_console::utils::error::{AppError, ValidationError};

use super::common_steps::split_list;
use crate::features::support::TestWorld;

#[given(expr = "the backend shift is {int} hours")]
async fn backend_shift(world: &mut TestWorld, hours: i64) {
    world.settings.timestamp_shift_hours = hours;
}

#[given("window order is enforced")]
async fn window_order_enforced(world: &mut TestWorld) {
    world.settings.enforce_window_order = true;
}

#[when(expr = "I enter the emails {string}")]
async fn enter_emails(world: &mut TestWorld, emails: String) {
    world.form_emails = split_list(&emails);
}

#[when(expr = "I set the effective time to {string}")]
async fn set_effective(world: &mut TestWorld, value: String) {
    world.effective_at = Some(value);
}

#[when(expr = "I set the expire time to {string}")]
async fn set_expire(world: &mut TestWorld, value: String) {
    world.expire_at = Some(value);
}

#[when("I build the membership request")]
async fn build_request(world: &mut TestWorld) {
    let offset = world.settings.local_utc_offset_hours;
    let parse = |value: &Option<String>| {
        value
            .as_deref()
            .map(|v| parse_form_datetime(v, offset).expect("step date-time should parse"))
    };
    let form = RawMembershipForm {
        emails: world.form_emails.clone(),
        member_type: Some(MemberType::Paid),
        account_quota: Some(100),
        effective_at: parse(&world.effective_at),
        expire_at: parse(&world.expire_at),
        ..Default::default()
    };

    let directory = world.directory();
    world.request = Some(MembershipMutationBuilder::new(&directory, &world.settings).build(&form));
}

#[when(expr = "the backend answers with status {int} and message {string}")]
async fn backend_answers(world: &mut TestWorld, status: i64, message: String) {
    let response: ApiResponse<serde_json::Value> = ApiResponse::new(status, Some(&message), None);
    world.outcome = Some(MutationOutcome::from_result(response.into_message()));
}

#[when("the backend cannot be reached")]
async fn backend_unreachable(world: &mut TestWorld) {
    let result = Err(AppError::Transport("connection refused".to_string()));
    world.outcome = Some(MutationOutcome::from_result(result));
}

#[then(expr = "the request sends the effective time {string}")]
async fn request_effective(world: &mut TestWorld, expected: String) {
    let request = match world.request.as_ref().expect("request was not built") {
        Ok(request) => request,
        Err(err) => panic!("request rejected: {}", err),
    };
    let expected = DateTime::parse_from_rfc3339(&expected).expect("expected time should parse");
    assert_eq!(request.params.effective_at, Some(expected.with_timezone(&Utc)));
}

#[then(expr = "the request targets {string}")]
async fn request_targets(world: &mut TestWorld, emails: String) {
    match world.request.as_ref().expect("request was not built") {
        Ok(request) => assert_eq!(request.emails, split_list(&emails)),
        Err(err) => panic!("request rejected: {}", err),
    }
}

#[then("the request is rejected because no email was given")]
async fn rejected_no_email(world: &mut TestWorld) {
    assert_eq!(world.last_error(), Some(&ValidationError::EmptyEmailSet));
}

#[then("the window is rejected")]
async fn window_rejected(world: &mut TestWorld) {
    assert!(matches!(
        world.last_error(),
        Some(ValidationError::InvalidWindow { .. })
    ));
}

#[then("the form is reset")]
async fn form_reset(world: &mut TestWorld) {
    let outcome = world.outcome.as_ref().expect("nothing was submitted");
    assert!(outcome.resets_form());
}

#[then(expr = "the form is kept with message {string}")]
async fn form_kept(world: &mut TestWorld, message: String) {
    let outcome = world.outcome.as_ref().expect("nothing was submitted");
    assert!(!outcome.resets_form());
    assert_eq!(outcome.message(), message);
}

#[then("the operator may retry")]
async fn may_retry(world: &mut TestWorld) {
    assert!(matches!(
        world.outcome,
        Some(MutationOutcome::Failed { retryable: true, .. })
    ));
}
