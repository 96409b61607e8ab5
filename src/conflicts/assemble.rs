//! Reconstruction of a run's logical test results.
//!
//! The assembler receives the run and its owning report explicitly; runs
//! carry no back-reference to their report.

use crate::error::AriaError;
use crate::model::{TestPlanReport, TestPlanRun, TestResult};
use std::fmt;
use std::str::FromStr;

/// Produces the results of one run as the conflict engine should see them.
pub trait TestResultAssembler {
    fn test_results(&self, run: &TestPlanRun, report: &TestPlanReport) -> Vec<TestResult>;
}

/// Results exactly as the tester submitted them.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredResults;

impl TestResultAssembler for StoredResults {
    fn test_results(&self, run: &TestPlanRun, _report: &TestPlanReport) -> Vec<TestResult> {
        run.test_results.clone()
    }
}

/// Results for the report's runnable tests only, in test plan order.
///
/// Results for tests that were removed from the plan, or that do not apply
/// to the target's AT, are left out.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunnableResults;

impl TestResultAssembler for RunnableResults {
    fn test_results(&self, run: &TestPlanRun, report: &TestPlanReport) -> Vec<TestResult> {
        report
            .runnable_tests()
            .filter_map(|test| {
                run.test_results
                    .iter()
                    .find(|result| result.test_id == test.id)
                    .cloned()
            })
            .collect()
    }
}

/// Assembler selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssemblerKind {
    #[default]
    Stored,
    Runnable,
}

impl AssemblerKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Runnable => "runnable",
        }
    }
}

impl fmt::Display for AssemblerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssemblerKind {
    type Err = AriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stored" | "submitted" => Ok(Self::Stored),
            "runnable" => Ok(Self::Runnable),
            other => Err(AriaError::Config(format!(
                "unknown assembler '{other}' (expected stored or runnable)"
            ))),
        }
    }
}

impl TestResultAssembler for AssemblerKind {
    fn test_results(&self, run: &TestPlanRun, report: &TestPlanReport) -> Vec<TestResult> {
        match self {
            Self::Stored => StoredResults.test_results(run, report),
            Self::Runnable => RunnableResults.test_results(run, report),
        }
    }
}
