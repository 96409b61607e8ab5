use crate::conflicts::ConflictRecord;
use crate::model::{ReportStatus, TestPlanReport, TestPlanRun};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the report queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportListing {
    pub id: i64,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub target: TargetListing,
    pub version: VersionListing,
    pub test_count: usize,
    pub conflict_count: usize,
    pub draft_runs: Vec<RunListing>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetListing {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionListing {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_message: Option<String>,
}

/// A tester's run with how many results they have finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunListing {
    pub id: i64,
    pub tester: String,
    pub test_result_count: usize,
}

impl From<&TestPlanRun> for RunListing {
    fn from(run: &TestPlanRun) -> Self {
        Self {
            id: run.id,
            tester: run.tester.username.clone(),
            test_result_count: run.completed_result_count(),
        }
    }
}

impl ReportListing {
    #[must_use]
    pub fn from_report(report: &TestPlanReport, conflict_count: usize) -> Self {
        let version = &report.test_plan_version;
        Self {
            id: report.id,
            status: report.status,
            created_at: report.created_at,
            target: TargetListing {
                id: report.test_plan_target.id,
                title: report.test_plan_target.title(),
            },
            version: VersionListing {
                id: version.id,
                title: version.title.clone(),
                git_sha: version.git_sha.clone(),
                git_message: version.git_message.clone(),
            },
            test_count: report.runnable_tests().count(),
            conflict_count,
            draft_runs: report.test_plan_runs.iter().map(RunListing::from).collect(),
        }
    }

    #[must_use]
    pub fn run_count(&self) -> usize {
        self.draft_runs.len()
    }
}

/// Conflicts for one report, as printed by `aat conflicts --json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictsOutput {
    pub report_id: i64,
    pub conflict_count: usize,
    pub conflicts: Vec<ConflictRecord>,
}

impl ConflictsOutput {
    #[must_use]
    pub fn new(report_id: i64, conflicts: Vec<ConflictRecord>) -> Self {
        Self {
            report_id,
            conflict_count: conflicts.len(),
            conflicts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflicts::fixtures::{agreeing_pair, definition, report, run};

    #[test]
    fn listing_counts_runnable_tests_and_completed_results() {
        let mut report = agreeing_pair();
        report.test_plan_runs[1].test_results[0].completed_at = None;
        let listing = ReportListing::from_report(&report, 2);

        assert_eq!(listing.id, 7);
        assert_eq!(listing.test_count, 1);
        assert_eq!(listing.conflict_count, 2);
        assert_eq!(listing.run_count(), 2);
        assert_eq!(listing.draft_runs[0].tester, "tester1");
        assert_eq!(listing.draft_runs[0].test_result_count, 1);
        assert_eq!(listing.draft_runs[1].test_result_count, 0);
        assert_eq!(listing.target.title, "NVDA 2020.4 with Firefox 88.0");
    }

    #[test]
    fn listing_skips_tests_for_other_ats() {
        let mut other = definition("t2", 1, 1);
        other.at_ids = vec![2];
        let report = report(vec![definition("t1", 1, 1), other], vec![run(1, vec![])]);
        let listing = ReportListing::from_report(&report, 0);
        assert_eq!(listing.test_count, 1);
    }

    #[test]
    fn listing_json_uses_snake_case_keys() {
        let listing = ReportListing::from_report(&agreeing_pair(), 0);
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["status"], "IN_REVIEW");
        assert_eq!(json["version"]["git_sha"], "0a1b2c3");
        assert_eq!(json["draft_runs"][1]["tester"], "tester2");
    }

    #[test]
    fn conflicts_output_counts_records() {
        let output = ConflictsOutput::new(7, vec![]);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["report_id"], 7);
        assert_eq!(json["conflict_count"], 0);
        assert!(json["conflicts"].as_array().unwrap().is_empty());
    }
}
