//! Dereferencing of conflict references into display-ready entities.
//!
//! A `Populator` turns a lightweight locator into the ancestry a reviewer
//! needs: the result itself plus its run, tester, test result and test
//! definitions. `ReportPopulator` answers every lookup from the report that
//! was already loaded for detection, so no store access happens here.

use super::{ConflictSource, ResultRef};
use crate::error::{AriaError, Result};
use crate::model::{
    Assertion, AssertionResult, ReportStatus, Scenario, ScenarioResult, Test, TestPlanReport,
    TestPlanRun, TestPlanTarget, TestResult, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What to resolve.
#[derive(Debug, Clone, Copy)]
pub enum Locator<'a> {
    /// A scenario of the named test, optionally narrowed to one of its
    /// assertions. Scenario and assertion ids are only unique within a test.
    Source {
        test_id: &'a str,
        source: &'a ConflictSource,
    },
    /// A submitted scenario or assertion result.
    Result(&'a ResultRef),
}

/// Entities already in memory that population may read from.
#[derive(Debug, Clone, Copy)]
pub struct Preloaded<'a> {
    pub test_plan_report: &'a TestPlanReport,
}

impl<'a> Preloaded<'a> {
    #[must_use]
    pub const fn new(test_plan_report: &'a TestPlanReport) -> Self {
        Self { test_plan_report }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: i64,
    pub status: ReportStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: i64,
    pub tester: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultSummary {
    pub id: String,
    pub test_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    pub id: String,
    pub title: String,
    pub row_number: u32,
}

/// A resolved locator with every ancestor that applies to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulatedData {
    pub test_plan_report: ReportSummary,
    pub test_plan_target: TestPlanTarget,
    pub test_plan_version: VersionSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_plan_run: Option<RunSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_result: Option<TestResultSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_result: Option<ScenarioResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_result: Option<AssertionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<TestSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Scenario>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion: Option<Assertion>,
}

impl PopulatedData {
    fn for_report(report: &TestPlanReport) -> Self {
        let version = &report.test_plan_version;
        Self {
            test_plan_report: ReportSummary {
                id: report.id,
                status: report.status,
            },
            test_plan_target: report.test_plan_target.clone(),
            test_plan_version: VersionSummary {
                id: version.id,
                title: version.title.clone(),
                git_sha: version.git_sha.clone(),
            },
            test_plan_run: None,
            test_result: None,
            scenario_result: None,
            assertion_result: None,
            test: None,
            scenario: None,
            assertion: None,
        }
    }

    fn with_test(mut self, test: &Test) -> Self {
        self.test = Some(TestSummary {
            id: test.id.clone(),
            title: test.title.clone(),
            row_number: test.row_number,
        });
        self
    }

    fn with_result(mut self, run: &TestPlanRun, result: &TestResult) -> Self {
        self.test_plan_run = Some(RunSummary {
            id: run.id,
            tester: run.tester.clone(),
        });
        self.test_result = Some(TestResultSummary {
            id: result.id.clone(),
            test_id: result.test_id.clone(),
            started_at: result.started_at,
            completed_at: result.completed_at,
        });
        self
    }

    /// Username of the tester this data belongs to, if it is a result.
    #[must_use]
    pub fn tester(&self) -> Option<&str> {
        self.test_plan_run
            .as_ref()
            .map(|run| run.tester.username.as_str())
    }
}

/// Resolves locators into populated entities.
#[async_trait]
pub trait Populator: Send + Sync {
    /// # Errors
    ///
    /// Returns `AriaError::StaleReference` when the locator does not exist in
    /// the preloaded report.
    async fn populate(&self, locator: Locator<'_>, preloaded: &Preloaded<'_>)
    -> Result<PopulatedData>;
}

/// Populator that reads only from the preloaded report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportPopulator;

#[async_trait]
impl Populator for ReportPopulator {
    async fn populate(
        &self,
        locator: Locator<'_>,
        preloaded: &Preloaded<'_>,
    ) -> Result<PopulatedData> {
        let report = preloaded.test_plan_report;
        match locator {
            Locator::Source { test_id, source } => populate_source(report, test_id, source),
            Locator::Result(ResultRef::ScenarioResult { scenario_result_id }) => {
                populate_scenario_result(report, scenario_result_id)
            }
            Locator::Result(ResultRef::AssertionResult {
                assertion_result_id,
            }) => populate_assertion_result(report, assertion_result_id),
        }
    }
}

fn stale(report: &TestPlanReport, kind: &'static str, id: &str) -> AriaError {
    AriaError::StaleReference {
        kind,
        id: id.to_string(),
        report_id: report.id,
    }
}

fn populate_source(
    report: &TestPlanReport,
    test_id: &str,
    source: &ConflictSource,
) -> Result<PopulatedData> {
    let test = report
        .test_plan_version
        .test(test_id)
        .ok_or_else(|| stale(report, "test", test_id))?;
    let scenario = test
        .scenario(&source.scenario_id)
        .ok_or_else(|| stale(report, "scenario", &source.scenario_id))?;

    let assertion = match &source.assertion_id {
        Some(assertion_id) => Some(
            test.assertion(assertion_id)
                .ok_or_else(|| stale(report, "assertion", assertion_id))?
                .clone(),
        ),
        None => None,
    };

    let mut data = PopulatedData::for_report(report).with_test(test);
    data.scenario = Some(scenario.clone());
    data.assertion = assertion;
    Ok(data)
}

fn populate_scenario_result(report: &TestPlanReport, id: &str) -> Result<PopulatedData> {
    for run in &report.test_plan_runs {
        for result in &run.test_results {
            if let Some(scenario_result) = result.scenario_results.iter().find(|s| s.id == id) {
                let mut data = PopulatedData::for_report(report).with_result(run, result);
                if let Some(test) = report.test_plan_version.test(&result.test_id) {
                    data.scenario = test.scenario(&scenario_result.scenario_id).cloned();
                    data = data.with_test(test);
                }
                data.scenario_result = Some(scenario_result.clone());
                return Ok(data);
            }
        }
    }
    Err(stale(report, "scenario result", id))
}

fn populate_assertion_result(report: &TestPlanReport, id: &str) -> Result<PopulatedData> {
    for run in &report.test_plan_runs {
        for result in &run.test_results {
            for scenario_result in &result.scenario_results {
                let Some(assertion_result) =
                    scenario_result.assertion_results.iter().find(|a| a.id == id)
                else {
                    continue;
                };
                let mut data = PopulatedData::for_report(report).with_result(run, result);
                if let Some(test) = report.test_plan_version.test(&result.test_id) {
                    data.scenario = test.scenario(&scenario_result.scenario_id).cloned();
                    data.assertion = test.assertion(&assertion_result.assertion_id).cloned();
                    data = data.with_test(test);
                }
                data.scenario_result = Some(scenario_result.clone());
                data.assertion_result = Some(assertion_result.clone());
                return Ok(data);
            }
        }
    }
    Err(stale(report, "assertion result", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflicts::fixtures::{
        agreeing_pair, definition, passing_result, report, run, with_local_ids,
    };
    use futures::executor::block_on;

    #[test]
    fn scenario_result_resolves_ancestry() {
        let report = agreeing_pair();
        let preloaded = Preloaded::new(&report);
        let reference = ResultRef::ScenarioResult {
            scenario_result_id: "r2:t1:1".to_string(),
        };
        let data = block_on(ReportPopulator.populate(Locator::Result(&reference), &preloaded))
            .unwrap();

        assert_eq!(data.tester(), Some("tester2"));
        assert_eq!(data.test_result.as_ref().unwrap().id, "r2:t1");
        assert_eq!(data.scenario.as_ref().unwrap().id, "t1-s1");
        assert_eq!(data.scenario_result.as_ref().unwrap().id, "r2:t1:1");
        assert!(data.assertion_result.is_none());
        assert_eq!(data.test.as_ref().unwrap().id, "t1");
        assert_eq!(data.test_plan_report.id, 7);
    }

    #[test]
    fn assertion_result_resolves_definitions() {
        let report = agreeing_pair();
        let preloaded = Preloaded::new(&report);
        let reference = ResultRef::AssertionResult {
            assertion_result_id: "r1:t1:0:1".to_string(),
        };
        let data = block_on(ReportPopulator.populate(Locator::Result(&reference), &preloaded))
            .unwrap();

        assert_eq!(data.tester(), Some("tester1"));
        assert_eq!(data.assertion.as_ref().unwrap().id, "t1-a1");
        assert_eq!(data.assertion_result.as_ref().unwrap().id, "r1:t1:0:1");
        assert_eq!(data.scenario_result.as_ref().unwrap().id, "r1:t1:0");
    }

    #[test]
    fn source_resolves_scenario_and_assertion() {
        let report = agreeing_pair();
        let preloaded = Preloaded::new(&report);
        let source = ConflictSource {
            scenario_id: "t1-s1".to_string(),
            assertion_id: Some("t1-a0".to_string()),
        };
        let locator = Locator::Source {
            test_id: "t1",
            source: &source,
        };
        let data = block_on(ReportPopulator.populate(locator, &preloaded)).unwrap();

        assert!(data.test_plan_run.is_none());
        assert_eq!(data.scenario.unwrap().commands, vec!["DOWN 1".to_string()]);
        assert_eq!(data.assertion.unwrap().text, "Assertion 0 is conveyed");
    }

    #[test]
    fn missing_ids_are_stale_references() {
        let report = agreeing_pair();
        let preloaded = Preloaded::new(&report);
        let reference = ResultRef::AssertionResult {
            assertion_result_id: "deleted".to_string(),
        };
        let err = block_on(ReportPopulator.populate(Locator::Result(&reference), &preloaded))
            .unwrap_err();
        assert!(matches!(
            err,
            AriaError::StaleReference { kind: "assertion result", report_id: 7, .. }
        ));

        let source = ConflictSource {
            scenario_id: "t1-s0".to_string(),
            assertion_id: Some("t9-a0".to_string()),
        };
        let locator = Locator::Source {
            test_id: "t1",
            source: &source,
        };
        let err = block_on(ReportPopulator.populate(locator, &preloaded)).unwrap_err();
        assert!(matches!(err, AriaError::StaleReference { kind: "assertion", .. }));

        let locator = Locator::Source {
            test_id: "t9",
            source: &source,
        };
        let err = block_on(ReportPopulator.populate(locator, &preloaded)).unwrap_err();
        assert!(matches!(err, AriaError::StaleReference { kind: "test", .. }));
    }

    #[test]
    fn source_stays_within_its_test() {
        // Both tests use the ids s0 and a0; t1 has no second assertion.
        let first = with_local_ids(definition("t1", 1, 1));
        let mut second = with_local_ids(definition("t2", 1, 2));
        second.title = "Operate the checkbox".to_string();
        second.scenarios[0].commands = vec!["SPACE".to_string()];
        let report = report(
            vec![first.clone(), second.clone()],
            vec![
                run(1, vec![passing_result(1, &first), passing_result(1, &second)]),
                run(2, vec![passing_result(2, &first), passing_result(2, &second)]),
            ],
        );
        let preloaded = Preloaded::new(&report);
        let source = ConflictSource {
            scenario_id: "s0".to_string(),
            assertion_id: Some("a1".to_string()),
        };
        let locator = Locator::Source {
            test_id: "t2",
            source: &source,
        };
        let data = block_on(ReportPopulator.populate(locator, &preloaded)).unwrap();

        assert_eq!(data.test.unwrap().title, "Operate the checkbox");
        assert_eq!(data.scenario.unwrap().commands, vec!["SPACE".to_string()]);
        assert_eq!(data.assertion.unwrap().id, "a1");
    }
}
