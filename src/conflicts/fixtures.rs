//! Report builders shared by the conflict engine's unit tests.

use crate::model::{
    Assertion, AssertionResult, At, Browser, ReportStatus, Scenario, ScenarioResult, Test,
    TestPlanReport, TestPlanRun, TestPlanTarget, TestPlanVersion, TestResult, User,
};
use chrono::{TimeZone, Utc};

/// A test definition with `scenarios` scenarios and `assertions` assertions.
pub fn definition(test_id: &str, scenarios: usize, assertions: usize) -> Test {
    Test {
        id: test_id.to_string(),
        title: format!("Navigate to {test_id}"),
        row_number: 1,
        at_ids: vec![],
        scenarios: (0..scenarios)
            .map(|i| Scenario {
                id: format!("{test_id}-s{i}"),
                at_id: 1,
                commands: vec![format!("DOWN {i}")],
            })
            .collect(),
        assertions: (0..assertions)
            .map(|j| Assertion {
                id: format!("{test_id}-a{j}"),
                priority: 1,
                text: format!("Assertion {j} is conveyed"),
            })
            .collect(),
    }
}

/// Rename scenarios to `s{i}` and assertions to `a{j}`, ids that repeat
/// across tests.
pub fn with_local_ids(mut test: Test) -> Test {
    for (i, scenario) in test.scenarios.iter_mut().enumerate() {
        scenario.id = format!("s{i}");
    }
    for (j, assertion) in test.assertions.iter_mut().enumerate() {
        assertion.id = format!("a{j}");
    }
    test
}

/// A finalized, all-passing result for `test`, tagged with the run id.
pub fn passing_result(run_id: i64, test: &Test) -> TestResult {
    TestResult {
        id: format!("r{run_id}:{}", test.id),
        test_id: test.id.clone(),
        started_at: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
        completed_at: Some(Utc.timestamp_opt(1_700_000_600, 0).unwrap()),
        scenario_results: test
            .scenarios
            .iter()
            .enumerate()
            .map(|(i, scenario)| ScenarioResult {
                id: format!("r{run_id}:{}:{i}", test.id),
                scenario_id: scenario.id.clone(),
                output: Some(format!("output from run {run_id}")),
                unexpected_behaviors: vec![],
                assertion_results: test
                    .assertions
                    .iter()
                    .enumerate()
                    .map(|(j, assertion)| AssertionResult {
                        id: format!("r{run_id}:{}:{i}:{j}", test.id),
                        assertion_id: assertion.id.clone(),
                        passed: true,
                        failed_reason: None,
                    })
                    .collect(),
            })
            .collect(),
    }
}

pub fn run(id: i64, test_results: Vec<TestResult>) -> TestPlanRun {
    TestPlanRun {
        id,
        tester: User {
            id: 100 + id,
            username: format!("tester{id}"),
        },
        test_results,
    }
}

pub fn report(tests: Vec<Test>, runs: Vec<TestPlanRun>) -> TestPlanReport {
    TestPlanReport {
        id: 7,
        status: ReportStatus::InReview,
        created_at: Utc.timestamp_opt(1_699_000_000, 0).unwrap(),
        test_plan_target: TestPlanTarget {
            id: 3,
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
            id: 5,
            title: "Checkbox Example (Two State)".to_string(),
            directory: "checkbox".to_string(),
            git_sha: Some("0a1b2c3".to_string()),
            git_message: Some("Update checkbox tests".to_string()),
            tests,
        },
        test_plan_runs: runs,
    }
}

/// Two runs that agree on every result of a 2x2 test.
pub fn agreeing_pair() -> TestPlanReport {
    let test = definition("t1", 2, 2);
    let runs = vec![
        run(1, vec![passing_result(1, &test)]),
        run(2, vec![passing_result(2, &test)]),
    ];
    report(vec![test], runs)
}
