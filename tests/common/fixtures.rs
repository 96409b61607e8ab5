//! Report graphs built through the public model types.

use aria_at_rust::model::{
    Assertion, AssertionResult, At, Browser, FailedReason, ReportStatus, Scenario,
    ScenarioResult, Test, TestPlanReport, TestPlanRun, TestPlanTarget, TestPlanVersion,
    TestResult, UnexpectedBehavior, User,
};
use aria_at_rust::storage::ReportBundle;
use chrono::{TimeZone, Utc};

pub const CHECKBOX_BUNDLE: &str = include_str!("../fixtures/checkbox_bundle.json");

pub fn checkbox_bundle_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/checkbox_bundle.json")
}

pub fn checkbox_bundle() -> ReportBundle {
    ReportBundle::from_json(CHECKBOX_BUNDLE).expect("checkbox bundle parses")
}

/// A test with `scenarios` x `assertions` definitions.
pub fn test_definition(id: &str, scenarios: usize, assertions: usize) -> Test {
    Test {
        id: id.to_string(),
        title: format!("Test {id}"),
        row_number: 1,
        at_ids: vec![],
        scenarios: (0..scenarios)
            .map(|i| Scenario {
                id: format!("{id}-s{i}"),
                at_id: 1,
                commands: vec![format!("CMD {i}")],
            })
            .collect(),
        assertions: (0..assertions)
            .map(|j| Assertion {
                id: format!("{id}-a{j}"),
                priority: 1,
                text: format!("Assertion {j}"),
            })
            .collect(),
    }
}

/// Verdict for one assertion position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(Option<FailedReason>),
}

/// What one tester reported for one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub output: Option<String>,
    pub unexpected: Vec<UnexpectedBehavior>,
    pub verdicts: Vec<Verdict>,
}

impl ScenarioOutcome {
    pub fn passing(assertions: usize) -> Self {
        Self {
            output: Some("spoken output".to_string()),
            unexpected: vec![],
            verdicts: vec![Verdict::Pass; assertions],
        }
    }
}

/// A finalized result for `test` from tester `tag`.
pub fn finalized_result(tag: &str, test: &Test, outcomes: &[ScenarioOutcome]) -> TestResult {
    TestResult {
        id: format!("{tag}-{}", test.id),
        test_id: test.id.clone(),
        started_at: Some(Utc.with_ymd_and_hms(2021, 5, 1, 9, 0, 0).unwrap()),
        completed_at: Some(Utc.with_ymd_and_hms(2021, 5, 1, 9, 30, 0).unwrap()),
        scenario_results: test
            .scenarios
            .iter()
            .zip(outcomes)
            .enumerate()
            .map(|(i, (scenario, outcome))| ScenarioResult {
                id: format!("{tag}-{}-s{i}", test.id),
                scenario_id: scenario.id.clone(),
                output: outcome.output.clone(),
                unexpected_behaviors: outcome.unexpected.clone(),
                assertion_results: test
                    .assertions
                    .iter()
                    .zip(&outcome.verdicts)
                    .enumerate()
                    .map(|(j, (assertion, verdict))| AssertionResult {
                        id: format!("{tag}-{}-s{i}-a{j}", test.id),
                        assertion_id: assertion.id.clone(),
                        passed: *verdict == Verdict::Pass,
                        failed_reason: match verdict {
                            Verdict::Pass => None,
                            Verdict::Fail(reason) => reason.clone(),
                        },
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// An all-passing finalized result.
pub fn passing_result(tag: &str, test: &Test) -> TestResult {
    let outcomes = vec![ScenarioOutcome::passing(test.assertions.len()); test.scenarios.len()];
    finalized_result(tag, test, &outcomes)
}

pub fn tester_run(id: i64, username: &str, test_results: Vec<TestResult>) -> TestPlanRun {
    TestPlanRun {
        id,
        tester: User {
            id: 10 + id,
            username: username.to_string(),
        },
        test_results,
    }
}

pub fn report_with(tests: Vec<Test>, runs: Vec<TestPlanRun>) -> TestPlanReport {
    TestPlanReport {
        id: 1,
        status: ReportStatus::InReview,
        created_at: Utc.with_ymd_and_hms(2021, 4, 30, 12, 0, 0).unwrap(),
        test_plan_target: TestPlanTarget {
            id: 1,
            at: At {
                id: 1,
                name: "NVDA".to_string(),
            },
            at_version: "2020.4".to_string(),
            browser: Browser {
                id: 1,
                name: "Firefox".to_string(),
            },
            browser_version: "88.0".to_string(),
        },
        test_plan_version: TestPlanVersion {
            id: 1,
            title: "Checkbox Example (Two State)".to_string(),
            directory: "checkbox".to_string(),
            git_sha: Some("0a1b2c3".to_string()),
            git_message: None,
            tests,
        },
        test_plan_runs: runs,
    }
}
