//! Membership workflow tests

use chrono::DateTime;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use quota_console::config::MembershipConfig;
use quota_console::models::MemberType;
use quota_console::services::membership::{self, submit};
use quota_console::services::{DirectoryCache, MembershipMutationBuilder, RawMembershipForm};
use quota_console::utils::error::{AppError, ValidationError};

use crate::common::*;

fn form(emails: &[&str]) -> RawMembershipForm {
    RawMembershipForm {
        emails: emails.iter().map(|e| e.to_string()).collect(),
        member_type: Some(MemberType::Paid),
        account_quota: Some(100),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_invalid_emails_block_submission() {
    let backend = MockBackend::new().with_registered(DirectoryFixtures::registered());
    let cache = DirectoryCache::new();
    let directory = cache.get_or_load(&backend).await.unwrap();
    let settings = MembershipConfig::default();

    let result = MembershipMutationBuilder::new(&directory, &settings).build(&form(&[
        emails::ALICE,
        emails::MALFORMED,
        emails::UNREGISTERED,
    ]));

    match result {
        Err(ValidationError::InvalidEmailSet(issues)) => {
            assert!(issues.malformed.contains(emails::MALFORMED));
            assert!(issues.unregistered.contains(emails::UNREGISTERED));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(backend.submission_count(), 0);
}

#[tokio::test]
async fn test_successful_grant_is_recorded() {
    let backend = MockBackend::new().with_registered(DirectoryFixtures::registered());
    let directory = DirectoryFixtures::directory();
    let settings = MembershipConfig::default();

    let request = MembershipMutationBuilder::new(&directory, &settings)
        .build(&form(&[emails::ALICE, emails::BOB]))
        .unwrap();
    let outcome = submit(&backend, &request).await;

    assert!(outcome.resets_form());
    assert_eq!(backend.submission_count(), 1);
}

#[tokio::test]
async fn test_rejected_grant_keeps_form() {
    let backend = MockBackend::new();
    backend.set_error_mode(MockError::Rejected {
        status_code: 4000,
        message: "quota exceeded".to_string(),
    });
    let directory = DirectoryFixtures::directory();
    let settings = MembershipConfig::default();

    let request = MembershipMutationBuilder::new(&directory, &settings)
        .build(&form(&[emails::ALICE]))
        .unwrap();
    let outcome = submit(&backend, &request).await;

    assert!(!outcome.resets_form());
    assert_eq!(outcome.message(), "quota exceeded");
}

#[tokio::test]
async fn test_grant_over_http_sends_shifted_window() {
    let backend = TestBackend::start().await;
    Mock::given(method("POST"))
        .and(path("/userMember/admin"))
        .and(body_partial_json(json!({
            "emails": [emails::ALICE],
            "params": {
                "type": "PAID",
                "accountQuota": 100,
                "effectiveAt": "2024-01-01T00:00:00Z"
            },
            "description": "annual plan"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(EnvelopeFixtures::success(json!(null))),
        )
        .expect(1)
        .mount(&backend.server)
        .await;

    let directory = DirectoryFixtures::directory();
    let settings = MembershipConfig::default();
    let mut raw = form(&[emails::ALICE]);
    raw.effective_at = Some(DateTime::parse_from_rfc3339("2024-01-01T00:00:00+08:00").unwrap());
    raw.description = Some("annual plan".to_string());

    let request = MembershipMutationBuilder::new(&directory, &settings)
        .build(&raw)
        .unwrap();
    let outcome = submit(&backend.client(), &request).await;
    assert!(outcome.resets_form(), "{}", outcome.message());
}

#[tokio::test]
async fn test_directory_loaded_once_per_context() {
    let backend = TestBackend::start().await;
    Mock::given(method("GET"))
        .and(path("/userMember/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(EnvelopeFixtures::success(
            json!(DirectoryFixtures::registered()),
        )))
        .expect(1)
        .mount(&backend.server)
        .await;

    let ctx = backend.context();
    let first = ctx.directory().await.unwrap();
    let second = ctx.directory().await.unwrap();
    assert_eq!(first.len(), 3);
    assert!(second.contains(emails::BOSS));
}

#[tokio::test]
async fn test_lookup_rejects_empty_selection() {
    let backend = MockBackend::new();
    let err = membership::lookup_members(&backend, &[]).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::EmptyEmailSet)
    ));
}

#[tokio::test]
async fn test_lookup_reports_unregistered() {
    let backend = MockBackend::new().with_registered(DirectoryFixtures::registered());
    let picked = vec![emails::ALICE.to_string(), EmailFactory::one()];
    let info = membership::lookup_members(&backend, &picked).await.unwrap();
    assert_eq!(info.stats.found, 1);
    assert_eq!(info.stats.not_found_emails, vec![picked[1].clone()]);
}
