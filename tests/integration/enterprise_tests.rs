//! Enterprise roster and service tests

use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use quota_console::models::CreateEnterpriseParams;
use quota_console::services::{EnterpriseRosterEngine, RosterDraft, RosterOperation};
use quota_console::utils::error::{AppError, ValidationError};

use crate::common::*;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_admins_are_always_members() {
    let directory = DirectoryFixtures::directory();
    let engine = EnterpriseRosterEngine::new(&directory, &[], RosterOperation::Create);
    let roster = engine
        .reconcile(&strings(&[emails::ALICE]), &strings(&[emails::BOSS, emails::ALICE]))
        .unwrap();

    for admin in &roster.valid_admins {
        assert!(roster.valid_members.contains(admin));
    }
    assert_eq!(roster.valid_members.len(), 2);
}

#[test]
fn test_add_members_rejects_existing_instead_of_dropping() {
    let directory = DirectoryFixtures::directory();
    let existing = vec![MemberBuilder::new(emails::BOSS).admin().build()];
    let engine = EnterpriseRosterEngine::new(&directory, &existing, RosterOperation::AddMembers);

    let err = engine
        .reconcile(&strings(&[emails::ALICE, emails::BOSS]), &[])
        .unwrap_err();
    assert_eq!(
        err.invalid_emails().into_iter().collect::<Vec<_>>(),
        vec![emails::BOSS]
    );
}

#[test]
fn test_random_unregistered_addresses_rejected() {
    let directory = DirectoryFixtures::directory();
    let engine = EnterpriseRosterEngine::new(&directory, &[], RosterOperation::Create);
    let strangers = EmailFactory::many(3);

    let err = engine.reconcile(&strangers, &[]).unwrap_err();
    assert_eq!(err.invalid_emails().len(), 3);
}

#[tokio::test]
async fn test_verification_outage_is_not_an_invalid_email() {
    let backend = MockBackend::new().with_registered(DirectoryFixtures::registered());
    backend.set_error_mode(MockError::Timeout);
    let directory = DirectoryFixtures::directory();
    let engine = EnterpriseRosterEngine::new(&directory, &[], RosterOperation::Create);

    let err = engine
        .reconcile_verified(&backend, &strings(&[emails::ALICE]), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ValidationError::VerificationUnavailable(_)));
    assert!(AppError::from(err).is_retryable());
}

#[tokio::test]
async fn test_create_sends_reconciled_roster() {
    let backend = TestBackend::start().await;
    backend
        .stub(
            "POST",
            "/userMember/members-info",
            EnvelopeFixtures::success(json!({
                "users": [],
                "stats": {"total": 2, "found": 2, "notFound": 0, "notFoundEmails": []}
            })),
        )
        .await;
    Mock::given(method("POST"))
        .and(path("/enterprise"))
        .and(body_json(json!({
            "name": "Acme",
            "accountQuota": 5000,
            "expireAt": "2025-01-01T00:00:00Z",
            "memberEmails": [emails::ALICE, emails::BOSS],
            "adminEmails": [emails::BOSS]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(EnvelopeFixtures::success(
            json!({"id": EnterpriseFixtures::ID}),
        )))
        .expect(1)
        .mount(&backend.server)
        .await;

    let ctx = backend.context();
    let directory = DirectoryFixtures::directory();
    let params = CreateEnterpriseParams::new(
        "Acme",
        5000,
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    );
    let draft = RosterDraft::with(&strings(&[emails::ALICE]), &strings(&[emails::BOSS]));

    let message = ctx
        .enterprises()
        .create(&directory, params, &draft)
        .await
        .unwrap();
    assert_eq!(message.as_deref(), Some("success"));
}

#[tokio::test]
async fn test_add_members_checks_current_roster() {
    let backend = TestBackend::start().await;
    backend
        .stub(
            "GET",
            "/enterprise/ent-acme",
            EnvelopeFixtures::success(EnterpriseFixtures::acme_json()),
        )
        .await;
    Mock::given(method("POST"))
        .and(path("/enterprise/ent-acme/members"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(EnvelopeFixtures::success(json!(null))),
        )
        .expect(0)
        .mount(&backend.server)
        .await;

    let ctx = backend.context();
    let directory = DirectoryFixtures::directory();
    let err = ctx
        .enterprises()
        .add_members(&directory, EnterpriseFixtures::ID, &strings(&[emails::ALICE]), &[])
        .await
        .unwrap_err();

    match err {
        AppError::Validation(ValidationError::InvalidEmailSet(issues)) => {
            assert!(issues.duplicates.contains(emails::ALICE));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_update_rejection_passes_message() {
    let backend = TestBackend::start().await;
    backend
        .stub(
            "PUT",
            "/enterprise/ent-acme",
            EnvelopeFixtures::rejection(4003, "enterprise is expired"),
        )
        .await;

    let ctx = backend.context();
    let params = quota_console::models::UpdateEnterpriseParams {
        account_quota: Some(9000),
        ..Default::default()
    };
    let err = ctx
        .enterprises()
        .update(EnterpriseFixtures::ID, &params)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "enterprise is expired");
}
