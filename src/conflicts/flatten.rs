//! Grouping of finalized results by test across a report's runs.

use super::assemble::TestResultAssembler;
use crate::model::{TestPlanReport, TestResult};
use std::collections::HashMap;
use tracing::trace;

/// Finalized results for one test, one per run, in run order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResultGroup {
    pub test_id: String,
    pub results: Vec<TestResult>,
}

/// Group every run's finalized results by test id.
///
/// Results without `completed_at` are skipped. Groups are ordered by the
/// first appearance of their test id while walking runs in order, and groups
/// with fewer than two results are dropped since there is nothing to compare.
pub fn flatten_runs<A>(report: &TestPlanReport, assembler: &A) -> Vec<TestResultGroup>
where
    A: TestResultAssembler + ?Sized,
{
    let mut groups: Vec<TestResultGroup> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for run in &report.test_plan_runs {
        for result in assembler.test_results(run, report) {
            if !result.is_finalized() {
                trace!(run_id = run.id, test_id = %result.test_id, "skipping unfinished result");
                continue;
            }
            if let Some(&index) = positions.get(&result.test_id) {
                groups[index].results.push(result);
            } else {
                positions.insert(result.test_id.clone(), groups.len());
                groups.push(TestResultGroup {
                    test_id: result.test_id.clone(),
                    results: vec![result],
                });
            }
        }
    }

    groups.retain(|group| group.results.len() > 1);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflicts::assemble::StoredResults;
    use crate::model::{
        At, Browser, ReportStatus, TestPlanRun, TestPlanTarget, TestPlanVersion, User,
    };
    use chrono::{TimeZone, Utc};

    fn result(id: &str, test_id: &str, done: bool) -> TestResult {
        TestResult {
            id: id.to_string(),
            test_id: test_id.to_string(),
            started_at: None,
            completed_at: done.then(|| Utc.timestamp_opt(1_700_000_100, 0).unwrap()),
            scenario_results: vec![],
        }
    }

    fn run(id: i64, results: Vec<TestResult>) -> TestPlanRun {
        TestPlanRun {
            id,
            tester: User {
                id,
                username: format!("tester{id}"),
            },
            test_results: results,
        }
    }

    fn report(runs: Vec<TestPlanRun>) -> TestPlanReport {
        TestPlanReport {
            id: 1,
            status: ReportStatus::Draft,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
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
                title: "Checkbox".to_string(),
                directory: "checkbox".to_string(),
                git_sha: None,
                git_message: None,
                tests: vec![],
            },
            test_plan_runs: runs,
        }
    }

    #[test]
    fn groups_by_test_in_run_order() {
        let report = report(vec![
            run(1, vec![result("a1", "t1", true), result("a2", "t2", true)]),
            run(2, vec![result("b2", "t2", true), result("b1", "t1", true)]),
        ]);
        let groups = flatten_runs(&report, &StoredResults);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].test_id, "t1");
        let ids: Vec<&str> = groups[0].results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b1"]);
        assert_eq!(groups[1].test_id, "t2");
    }

    #[test]
    fn unfinished_results_and_singletons_are_dropped() {
        let report = report(vec![
            run(1, vec![result("a1", "t1", true), result("a2", "t2", true)]),
            run(2, vec![result("b1", "t1", false), result("b2", "t2", true)]),
            run(3, vec![]),
        ]);
        let groups = flatten_runs(&report, &StoredResults);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].test_id, "t2");
    }

    #[test]
    fn empty_report_has_no_groups() {
        let report = report(vec![]);
        assert!(flatten_runs(&report, &StoredResults).is_empty());
    }
}
