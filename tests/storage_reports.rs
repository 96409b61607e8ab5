//! Storage tests with real `SQLite` (no mocks).
//!
//! Tests bundle import, report graph loading, provisioning and the report
//! operations used by the queue.

mod common;

use aria_at_rust::AriaError;
use aria_at_rust::model::{At, ReportStatus, User};
use aria_at_rust::storage::{
    CreatedLocation, Pagination, ProvisionRequest, Repository, ReportFilter, SqliteStorage,
    UserFilter,
};
use common::{fixtures, imported_db, test_db, test_db_with_dir};

// ============================================================================
// IMPORT
// ============================================================================

#[test]
fn import_checkbox_bundle_builds_both_reports() {
    let _log = common::test_log("import_checkbox_bundle_builds_both_reports");
    let mut storage = test_db();
    let summary = storage
        .import_report_bundle(&fixtures::checkbox_bundle())
        .unwrap();

    assert_eq!(summary.ats_created, 2);
    assert_eq!(summary.browsers_created, 2);
    assert_eq!(summary.users_created, 3);
    assert_eq!(summary.versions_created, 1);
    assert_eq!(summary.runs_created, 3);
    assert_eq!(summary.report_ids, vec![1, 2]);
    assert_eq!(summary.reports_created, vec![1, 2]);

    let nvda = storage.load_report(1).unwrap();
    assert_eq!(nvda.status, ReportStatus::InReview);
    assert_eq!(nvda.test_plan_target.title(), "NVDA 2020.4 with Firefox 88.0");
    assert_eq!(nvda.test_plan_version.tests.len(), 2);
    let testers: Vec<_> = nvda
        .test_plan_runs
        .iter()
        .map(|run| run.tester.username.as_str())
        .collect();
    assert_eq!(testers, vec!["alice", "bob"]);

    let voiceover = storage.load_report(2).unwrap();
    assert_eq!(voiceover.status, ReportStatus::Draft);
    assert_eq!(voiceover.runnable_tests().count(), 1);
    assert_eq!(voiceover.test_plan_runs[0].completed_result_count(), 0);
}

#[test]
fn reimport_is_stable() {
    let _log = common::test_log("reimport_is_stable");
    let mut storage = imported_db();
    let summary = storage
        .import_report_bundle(&fixtures::checkbox_bundle())
        .unwrap();

    assert_eq!(summary.ats_created, 0);
    assert_eq!(summary.users_created, 0);
    assert_eq!(summary.versions_created, 0);
    assert!(summary.reports_created.is_empty());
    assert_eq!(summary.runs_created, 0);
    assert_eq!(summary.runs_updated, 3);
    assert_eq!(storage.load_reports(&ReportFilter::default()).unwrap().len(), 2);
}

#[test]
fn rejected_bundle_writes_nothing() {
    let _log = common::test_log("rejected_bundle_writes_nothing");
    let mut storage = test_db();
    let broken = fixtures::CHECKBOX_BUNDLE.replace("\"scenario_id\": \"t2-s1\"", "\"scenario_id\": \"t2-s9\"");
    let err = storage
        .import_report_bundle(&common::parse_bundle(&broken))
        .unwrap_err();

    assert!(matches!(err, AriaError::Validation { ref field, .. } if field == "scenario_results"));
    let ats = Repository::<At>::find_many(&storage.store(), &Default::default()).unwrap();
    assert!(ats.is_empty());
}

// ============================================================================
// PROVISIONING
// ============================================================================

#[test]
fn provisioning_an_imported_pairing_finds_everything() {
    let _log = common::test_log("provisioning_an_imported_pairing_finds_everything");
    let mut storage = imported_db();
    let outcome = storage
        .provision_report(&ProvisionRequest {
            at_id: 1,
            at_version: "2020.4".to_string(),
            browser_id: 1,
            browser_version: "88.0".to_string(),
            test_plan_version_id: 1,
        })
        .unwrap();

    assert!(outcome.created.is_empty());
    assert_eq!(outcome.test_plan_report.entity.id, 1);
    // An existing report keeps its status.
    assert_eq!(outcome.test_plan_report.entity.status, ReportStatus::InReview);
}

#[test]
fn provisioning_a_new_at_version_creates_target_and_report() {
    let _log = common::test_log("provisioning_a_new_at_version_creates_target_and_report");
    let mut storage = imported_db();
    let outcome = storage
        .provision_report(&ProvisionRequest {
            at_id: 1,
            at_version: "2021.1".to_string(),
            browser_id: 1,
            browser_version: "88.0".to_string(),
            test_plan_version_id: 1,
        })
        .unwrap();

    assert_eq!(
        outcome.created,
        vec![
            CreatedLocation::AtVersion {
                at_id: 1,
                version: "2021.1".to_string()
            },
            CreatedLocation::TestPlanTarget { id: 3 },
            CreatedLocation::TestPlanReport { id: 3 },
        ]
    );
    let report = storage.load_report(3).unwrap();
    assert_eq!(report.status, ReportStatus::Draft);
    assert!(report.test_plan_runs.is_empty());
}

// ============================================================================
// REPORT OPERATIONS
// ============================================================================

#[test]
fn assign_status_and_delete_flow() {
    let _log = common::test_log("assign_status_and_delete_flow");
    let mut storage = imported_db();
    let carol = Repository::<User>::find_many(
        &storage.store(),
        &UserFilter {
            username: Some("carol".to_string()),
        },
    )
    .unwrap()
    .remove(0);

    let (run, created) = storage.assign_tester(1, carol.id).unwrap();
    assert!(created);
    assert_eq!(run.test_plan_report_id, 1);
    let (again, created) = storage.assign_tester(1, carol.id).unwrap();
    assert!(!created);
    assert_eq!(again.id, run.id);
    assert_eq!(storage.load_report(1).unwrap().test_plan_runs.len(), 3);

    assert!(storage.remove_tester(1, carol.id).unwrap());
    assert!(!storage.remove_tester(1, carol.id).unwrap());

    let row = storage.update_report_status(1, ReportStatus::Finalized).unwrap();
    assert_eq!(row.status, ReportStatus::Finalized);
    let finalized = storage
        .load_reports(&ReportFilter {
            status: Some(ReportStatus::Finalized),
            ..ReportFilter::default()
        })
        .unwrap();
    assert_eq!(finalized.len(), 1);

    assert_eq!(storage.delete_report(1).unwrap(), 2);
    assert!(matches!(
        storage.load_report(1),
        Err(AriaError::NotFound { kind: "test plan report", .. })
    ));
    assert!(matches!(
        storage.delete_report(1),
        Err(AriaError::NotFound { .. })
    ));
}

#[test]
fn users_page_through_the_repository() {
    let _log = common::test_log("users_page_through_the_repository");
    let storage = imported_db();
    let page = Repository::<User>::find_page(
        &storage.store(),
        &UserFilter::default(),
        &Pagination { page: 1, limit: 2 },
    )
    .unwrap();

    assert_eq!(page.page, 2);
    assert_eq!(page.pages_count, 2);
    assert_eq!(page.total_results_count, 3);
    assert_eq!(page.results_count, 1);
    assert_eq!(page.data[0].username, "carol");
}

#[test]
fn file_database_survives_reopen() {
    let _log = common::test_log("file_database_survives_reopen");
    let (mut storage, dir) = test_db_with_dir();
    storage
        .import_report_bundle(&fixtures::checkbox_bundle())
        .unwrap();
    drop(storage);

    let reopened = SqliteStorage::open(&dir.path().join(".aria-at").join("aria-at.db")).unwrap();
    let report = reopened.load_report(1).unwrap();
    assert_eq!(report.test_plan_runs[1].tester.username, "bob");
    assert_eq!(report.test_plan_runs[1].test_results.len(), 2);
}
