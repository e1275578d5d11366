//! Usage query and export tests

use std::sync::Arc;

use tokio_test::{assert_err, assert_ok};

use quota_console::config::ExportConfig;
use quota_console::models::DateRange;
use quota_console::services::export::{QuotaWorkbook, DAILY_HEADERS, EVENTS_HEADERS};
use quota_console::services::{QuotaQueryCoordinator, UsageSlot};

use crate::common::*;

fn coordinator() -> QuotaQueryCoordinator<MockBackend> {
    QuotaQueryCoordinator::new(
        MockBackend::new().with_usage(vec![UsageFixtures::event()], vec![UsageFixtures::aggregate()]),
    )
}

#[tokio::test]
async fn test_daily_rejection_leaves_events_intact() {
    let backend = MockBackend::new()
        .with_usage(vec![UsageFixtures::event()], vec![UsageFixtures::aggregate()]);
    backend.set_daily_error(MockError::Rejected {
        status_code: 4000,
        message: "daily stats unavailable".to_string(),
    });
    let mut coordinator = QuotaQueryCoordinator::new(backend);

    let result = assert_ok!(coordinator.query(emails::ALICE, DateRange::unbounded()).await);
    assert_eq!(result.events.len(), 1);
    assert!(result.daily.is_empty());
    assert!(result.degraded.is_empty());
}

#[tokio::test]
async fn test_daily_timeout_marks_slot_degraded() {
    let backend = MockBackend::new()
        .with_usage(vec![UsageFixtures::event()], vec![UsageFixtures::aggregate()]);
    backend.set_daily_error(MockError::Timeout);
    let mut coordinator = QuotaQueryCoordinator::new(backend);

    let result = assert_ok!(coordinator.query(emails::ALICE, DateRange::unbounded()).await);
    assert_eq!(result.degraded, vec![UsageSlot::Daily]);
}

#[tokio::test]
async fn test_total_failure_keeps_previous_result() {
    let backend = Arc::new(
        MockBackend::new().with_usage(vec![UsageFixtures::event()], vec![UsageFixtures::aggregate()]),
    );
    let mut coordinator = QuotaQueryCoordinator::new(Arc::clone(&backend));
    assert_ok!(coordinator.query(emails::ALICE, DateRange::unbounded()).await);

    backend.set_error_mode(MockError::ConnectionRefused);
    let err = assert_err!(coordinator.query(emails::BOB, DateRange::unbounded()).await);
    assert!(err.is_retryable());

    let held = coordinator.current().unwrap();
    assert_eq!(held.email, emails::ALICE);
    assert_eq!(held.events.len(), 1);
    assert_eq!(held.daily.len(), 1);
}

#[tokio::test]
async fn test_export_of_query_result() {
    let mut coordinator = coordinator();
    let result = assert_ok!(coordinator.query(emails::ALICE, DateRange::unbounded()).await);

    let today = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let config = ExportConfig {
        output_dir: std::env::temp_dir().join(format!("quota-console-test-{}", std::process::id())),
        ..Default::default()
    };
    let workbook = QuotaWorkbook::build(result, today, &config).unwrap();

    assert_eq!(workbook.sheets.len(), 2);
    assert_eq!(workbook.sheets[0].headers, &EVENTS_HEADERS);
    assert_eq!(workbook.sheets[1].headers, &DAILY_HEADERS);

    let path = workbook.save(&config.output_dir).unwrap();
    assert!(path.ends_with("配额查询结果_alice@example.com_2024-03-01.xlsx"));
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
    let _ = std::fs::remove_dir_all(&config.output_dir);
}

#[tokio::test]
async fn test_context_query_over_http() {
    let backend = TestBackend::start().await;
    backend
        .stub(
            "GET",
            "/userMember/quota/details",
            EnvelopeFixtures::success(UsageFixtures::events_json()),
        )
        .await;
    backend
        .stub(
            "GET",
            "/userMember/quota/daily",
            EnvelopeFixtures::rejection(5000, "no aggregates"),
        )
        .await;

    let ctx = backend.context();
    let mut usage = ctx.usage.lock().await;
    let result = usage
        .query(emails::ALICE, DateRange::unbounded())
        .await
        .unwrap();
    assert_eq!(result.events.len(), 1);
    assert!(result.daily.is_empty());

    drop(usage);
    assert!(ctx.usage.lock().await.current().is_some());
}
