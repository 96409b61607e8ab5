//! Core data types for `aria_at_rust`.
//!
//! This module defines the report graph the conflict engine reads:
//! - `TestPlanReport` - All testing for one test plan version and target
//! - `TestPlanRun` - One tester's attempt at a report
//! - `TestResult` / `ScenarioResult` / `AssertionResult` - Submitted results
//! - `TestPlanVersion` / `Test` / `Scenario` / `Assertion` - Test definitions
//! - `TestPlanTarget` / `At` / `Browser` - What is being tested

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Review state of a test plan report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    #[default]
    Draft,
    InReview,
    Finalized,
}

impl ReportStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::InReview => "IN_REVIEW",
            Self::Finalized => "FINALIZED",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = crate::error::AriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "DRAFT" => Ok(Self::Draft),
            "IN_REVIEW" | "INREVIEW" => Ok(Self::InReview),
            "FINALIZED" | "FINAL" => Ok(Self::Finalized),
            other => Err(crate::error::AriaError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// Why an assertion was marked as failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailedReason {
    IncorrectOutput,
    NoOutput,
    #[serde(untagged)]
    Custom(String),
}

impl FailedReason {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::IncorrectOutput => "INCORRECT_OUTPUT",
            Self::NoOutput => "NO_OUTPUT",
            Self::Custom(value) => value,
        }
    }
}

impl fmt::Display for FailedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Behavior a tester observed that no assertion covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnexpectedBehavior {
    ExcessivelyVerbose,
    UnexpectedCursorPosition,
    Sluggish,
    AtCrashed,
    BrowserCrashed,
    Other,
    #[serde(untagged)]
    Custom(String),
}

impl UnexpectedBehavior {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ExcessivelyVerbose => "EXCESSIVELY_VERBOSE",
            Self::UnexpectedCursorPosition => "UNEXPECTED_CURSOR_POSITION",
            Self::Sluggish => "SLUGGISH",
            Self::AtCrashed => "AT_CRASHED",
            Self::BrowserCrashed => "BROWSER_CRASHED",
            Self::Other => "OTHER",
            Self::Custom(value) => value,
        }
    }
}

impl fmt::Display for UnexpectedBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An assistive technology, e.g. NVDA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct At {
    pub id: i64,
    pub name: String,
}

/// A known version of an assistive technology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtVersion {
    pub at_id: i64,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Browser {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserVersion {
    pub browser_id: i64,
    pub version: String,
}

/// The AT + browser + versions combination a report is run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlanTarget {
    pub id: i64,
    pub at: At,
    pub at_version: String,
    pub browser: Browser,
    pub browser_version: String,
}

impl TestPlanTarget {
    /// Display title, e.g. "NVDA 2020.4 with Firefox 88.0".
    #[must_use]
    pub fn title(&self) -> String {
        format!(
            "{} {} with {} {}",
            self.at.name, self.at_version, self.browser.name, self.browser_version
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// A single input combination within a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub at_id: i64,
    #[serde(default)]
    pub commands: Vec<String>,
}

/// A pass/fail checkpoint defined by a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub id: String,
    #[serde(default = "default_assertion_priority")]
    pub priority: u8,
    pub text: String,
}

const fn default_assertion_priority() -> u8 {
    1
}

/// A test definition from a test plan version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Test {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub row_number: u32,
    #[serde(default)]
    pub at_ids: Vec<i64>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

impl Test {
    #[must_use]
    pub fn scenario(&self, scenario_id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == scenario_id)
    }

    #[must_use]
    pub fn assertion(&self, assertion_id: &str) -> Option<&Assertion> {
        self.assertions.iter().find(|a| a.id == assertion_id)
    }
}

/// A snapshot of a test plan at one git revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlanVersion {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_message: Option<String>,
    #[serde(default)]
    pub tests: Vec<Test>,
}

impl TestPlanVersion {
    #[must_use]
    pub fn test(&self, test_id: &str) -> Option<&Test> {
        self.tests.iter().find(|t| t.id == test_id)
    }
}

/// One assertion verdict within a scenario result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    pub id: String,
    pub assertion_id: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<FailedReason>,
}

/// A tester's result for one scenario of a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub id: String,
    pub scenario_id: String,
    /// Free text the AT spoke. Never part of a conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default)]
    pub unexpected_behaviors: Vec<UnexpectedBehavior>,
    #[serde(default)]
    pub assertion_results: Vec<AssertionResult>,
}

/// A tester's result for one test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub test_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Unset while the tester is still working on the test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scenario_results: Vec<ScenarioResult>,
}

impl TestResult {
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// One tester's execution of a report's tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlanRun {
    pub id: i64,
    pub tester: User,
    #[serde(default)]
    pub test_results: Vec<TestResult>,
}

impl TestPlanRun {
    /// Number of results the tester has completed.
    #[must_use]
    pub fn completed_result_count(&self) -> usize {
        self.test_results.iter().filter(|r| r.is_finalized()).count()
    }
}

/// All testing for one test plan version against one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlanReport {
    pub id: i64,
    #[serde(default)]
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub test_plan_target: TestPlanTarget,
    pub test_plan_version: TestPlanVersion,
    #[serde(default)]
    pub test_plan_runs: Vec<TestPlanRun>,
}

impl TestPlanReport {
    /// Tests from the version that apply to the target's AT, in version order.
    ///
    /// Tests without any AT restriction apply to every target.
    pub fn runnable_tests(&self) -> impl Iterator<Item = &Test> {
        let at_id = self.test_plan_target.at.id;
        self.test_plan_version
            .tests
            .iter()
            .filter(move |test| test.at_ids.is_empty() || test.at_ids.contains(&at_id))
    }

    #[must_use]
    pub fn run(&self, run_id: i64) -> Option<&TestPlanRun> {
        self.test_plan_runs.iter().find(|run| run.id == run_id)
    }

    #[must_use]
    pub fn run_for_tester(&self, user_id: i64) -> Option<&TestPlanRun> {
        self.test_plan_runs.iter().find(|run| run.tester.id == user_id)
    }

    /// First scenario or assertion result id shared by two results of this
    /// report's runs.
    #[must_use]
    pub fn duplicate_result_id(&self) -> Option<&str> {
        duplicate_result_id(self.test_plan_runs.iter().flat_map(|run| &run.test_results))
    }
}

/// First scenario or assertion result id that appears more than once.
///
/// Conflict references are bare result ids, so they must be unique across
/// every run of a report.
#[must_use]
pub fn duplicate_result_id<'a, I>(results: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a TestResult>,
{
    let mut scenario_ids = HashSet::new();
    let mut assertion_ids = HashSet::new();
    for result in results {
        for scenario_result in &result.scenario_results {
            if !scenario_ids.insert(scenario_result.id.as_str()) {
                return Some(&scenario_result.id);
            }
            for assertion_result in &scenario_result.assertion_results {
                if !assertion_ids.insert(assertion_result.id.as_str()) {
                    return Some(&assertion_result.id);
                }
            }
        }
    }
    None
}
