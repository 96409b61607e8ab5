//! Conflict detection between testers' finalized results.
//!
//! Pipeline:
//! 1. [`flatten_runs`] groups each run's finalized results by test.
//! 2. [`locate_conflicts`] walks each group's scenario/assertion trees by
//!    position and records every disagreement as a [`ConflictDescriptor`].
//! 3. [`detect_conflicts`] fans population out over all descriptors and
//!    joins the results back in descriptor order as [`ConflictRecord`]s.
//!
//! Steps 1 and 2 are pure and synchronous. Nothing here mutates the report.

mod assemble;
mod compare;
mod flatten;
mod locate;
mod populate;
mod project;

#[cfg(test)]
pub(crate) mod fixtures;

pub use assemble::{AssemblerKind, RunnableResults, StoredResults, TestResultAssembler};
pub use compare::all_equal;
pub use flatten::{TestResultGroup, flatten_runs};
pub use locate::locate_conflicts;
pub use populate::{
    Locator, PopulatedData, Populator, Preloaded, ReportPopulator, ReportSummary, RunSummary,
    TestResultSummary, TestSummary, VersionSummary,
};
pub use project::{AssertionProjection, ScenarioProjection, project_assertion, project_scenario};

use crate::error::{AriaError, Result};
use crate::model::TestPlanReport;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Where a disagreement sits in the test definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConflictSource {
    pub scenario_id: String,
    /// Unset for scenario-level conflicts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_id: Option<String>,
}

/// Pointer to one tester's result at the conflicting position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultRef {
    ScenarioResult { scenario_result_id: String },
    AssertionResult { assertion_result_id: String },
}

impl ResultRef {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::ScenarioResult { scenario_result_id } => scenario_result_id,
            Self::AssertionResult {
                assertion_result_id,
            } => assertion_result_id,
        }
    }
}

/// An unresolved conflict: ids only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConflictDescriptor {
    pub test_id: String,
    pub source: ConflictSource,
    /// One entry per finalized result, in run order.
    pub conflicting_results: Vec<ResultRef>,
}

impl ConflictDescriptor {
    #[must_use]
    pub const fn is_assertion_level(&self) -> bool {
        self.source.assertion_id.is_some()
    }

    /// Stable SHA-256 identity of this conflict.
    ///
    /// Covers the test id, the source and every reference in order, so the
    /// same disagreement detected twice yields the same fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        let mut update = |s: &str| {
            hasher.update(s.as_bytes());
            hasher.update([0]);
        };

        update(&self.test_id);
        update(&self.source.scenario_id);
        update(self.source.assertion_id.as_deref().unwrap_or(""));
        for reference in &self.conflicting_results {
            update(reference.id());
        }

        format!("{:x}", hasher.finalize())
    }
}

/// A conflict with every reference dereferenced for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub test_id: String,
    pub fingerprint: String,
    pub source: PopulatedData,
    pub conflicting_results: Vec<PopulatedData>,
}

impl ConflictRecord {
    #[must_use]
    pub const fn is_assertion_level(&self) -> bool {
        self.source.assertion.is_some()
    }
}

/// What to do with a test whose finalized results differ in shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MisalignmentPolicy {
    /// Fail the whole detection.
    #[default]
    Error,
    /// Leave that test out and keep going.
    Skip,
}

impl MisalignmentPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for MisalignmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MisalignmentPolicy {
    type Err = AriaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" | "fail" => Ok(Self::Error),
            "skip" | "ignore" => Ok(Self::Skip),
            other => Err(AriaError::Config(format!(
                "unknown misaligned-results policy '{other}' (expected error or skip)"
            ))),
        }
    }
}

/// Options for a detection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectOptions {
    pub misaligned: MisalignmentPolicy,
}

/// Find every conflict in a report without dereferencing it.
///
/// # Errors
///
/// Returns `AriaError::MisalignedResults` under `MisalignmentPolicy::Error`
/// when finalized results for a test differ in shape.
pub fn locate_report_conflicts<A>(
    report: &TestPlanReport,
    assembler: &A,
    options: &DetectOptions,
) -> Result<Vec<ConflictDescriptor>>
where
    A: TestResultAssembler + ?Sized,
{
    let groups = flatten_runs(report, assembler);
    debug!(
        report_id = report.id,
        runs = report.test_plan_runs.len(),
        groups = groups.len(),
        "flattened test plan runs"
    );
    locate_conflicts(&groups, options.misaligned)
}

/// Number of conflicts in a report.
///
/// # Errors
///
/// Same as [`locate_report_conflicts`].
pub fn conflict_count<A>(report: &TestPlanReport, assembler: &A, options: &DetectOptions) -> Result<usize>
where
    A: TestResultAssembler + ?Sized,
{
    locate_report_conflicts(report, assembler, options).map(|conflicts| conflicts.len())
}

/// Reject a report whose runs reuse a scenario or assertion result id.
///
/// Conflict references carry only result ids, so a shared id would resolve
/// every reference to the first run holding it.
///
/// # Errors
///
/// Returns `AriaError::Validation` naming the first shared id.
pub fn ensure_unique_result_ids(report: &TestPlanReport) -> Result<()> {
    match report.duplicate_result_id() {
        Some(id) => Err(AriaError::validation(
            "test_plan_runs",
            format!(
                "test plan report {} uses result id '{id}' more than once",
                report.id
            ),
        )),
        None => Ok(()),
    }
}

/// Detect and fully populate every conflict in a report.
///
/// All populations run concurrently; the output keeps descriptor order.
/// Either every conflict resolves or the first failure is returned.
///
/// # Errors
///
/// Returns `AriaError::MisalignedResults` as [`locate_report_conflicts`] does,
/// `AriaError::Validation` when result ids repeat across runs, or
/// `AriaError::StaleReference` when a reference no longer resolves.
pub async fn detect_conflicts<A, P>(
    report: &TestPlanReport,
    assembler: &A,
    populator: &P,
    options: &DetectOptions,
) -> Result<Vec<ConflictRecord>>
where
    A: TestResultAssembler + ?Sized,
    P: Populator + ?Sized,
{
    ensure_unique_result_ids(report)?;
    let descriptors = locate_report_conflicts(report, assembler, options)?;
    let preloaded = Preloaded::new(report);

    let records = try_join_all(
        descriptors
            .iter()
            .map(|descriptor| populate_descriptor(populator, descriptor, &preloaded)),
    )
    .await?;

    info!(
        report_id = report.id,
        conflicts = records.len(),
        "detected conflicts"
    );
    Ok(records)
}

async fn populate_descriptor<P>(
    populator: &P,
    descriptor: &ConflictDescriptor,
    preloaded: &Preloaded<'_>,
) -> Result<ConflictRecord>
where
    P: Populator + ?Sized,
{
    let source = populator.populate(
        Locator::Source {
            test_id: &descriptor.test_id,
            source: &descriptor.source,
        },
        preloaded,
    );
    let conflicting = try_join_all(
        descriptor
            .conflicting_results
            .iter()
            .map(|reference| populator.populate(Locator::Result(reference), preloaded)),
    );
    let (source, conflicting_results) = futures::try_join!(source, conflicting)?;

    Ok(ConflictRecord {
        test_id: descriptor.test_id.clone(),
        fingerprint: descriptor.fingerprint(),
        source,
        conflicting_results,
    })
}
