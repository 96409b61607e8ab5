//! Positional walk over parallel result trees.

use super::compare::all_equal;
use super::flatten::TestResultGroup;
use super::project::{project_assertion, project_scenario};
use super::{ConflictDescriptor, ConflictSource, MisalignmentPolicy, ResultRef};
use crate::error::{AriaError, Result};
use crate::model::TestResult;
use tracing::{debug, warn};

/// Emit a descriptor for every scenario or assertion position where the
/// group's results disagree.
///
/// Order is test, then scenario index, then the scenario-level conflict
/// followed by that scenario's assertion-level conflicts. Both levels are
/// checked independently, so one position may produce both.
///
/// # Errors
///
/// Returns `AriaError::MisalignedResults` when a group's results do not share
/// the same scenario/assertion counts and the policy is `Error`.
pub fn locate_conflicts(
    groups: &[TestResultGroup],
    policy: MisalignmentPolicy,
) -> Result<Vec<ConflictDescriptor>> {
    let mut conflicts = Vec::new();

    for group in groups {
        if let Some(detail) = misalignment(&group.results) {
            match policy {
                MisalignmentPolicy::Error => {
                    return Err(AriaError::MisalignedResults {
                        test_id: group.test_id.clone(),
                        detail,
                    });
                }
                MisalignmentPolicy::Skip => {
                    warn!(test_id = %group.test_id, %detail, "skipping misaligned results");
                    continue;
                }
            }
        }

        let before = conflicts.len();
        locate_in_group(group, &mut conflicts);
        debug!(
            test_id = %group.test_id,
            results = group.results.len(),
            conflicts = conflicts.len() - before,
            "compared test results"
        );
    }

    Ok(conflicts)
}

fn locate_in_group(group: &TestResultGroup, conflicts: &mut Vec<ConflictDescriptor>) {
    let results = &group.results;
    let Some(first) = results.first() else {
        return;
    };

    for (i, first_scenario) in first.scenario_results.iter().enumerate() {
        let scenarios: Vec<_> = results
            .iter()
            .map(|result| project_scenario(&result.scenario_results[i]))
            .collect();
        if !all_equal(&scenarios) {
            conflicts.push(ConflictDescriptor {
                test_id: group.test_id.clone(),
                source: ConflictSource {
                    scenario_id: first_scenario.scenario_id.clone(),
                    assertion_id: None,
                },
                conflicting_results: results
                    .iter()
                    .map(|result| ResultRef::ScenarioResult {
                        scenario_result_id: result.scenario_results[i].id.clone(),
                    })
                    .collect(),
            });
        }

        for (j, first_assertion) in first_scenario.assertion_results.iter().enumerate() {
            let assertions: Vec<_> = results
                .iter()
                .map(|result| project_assertion(&result.scenario_results[i].assertion_results[j]))
                .collect();
            if !all_equal(&assertions) {
                conflicts.push(ConflictDescriptor {
                    test_id: group.test_id.clone(),
                    source: ConflictSource {
                        scenario_id: first_scenario.scenario_id.clone(),
                        assertion_id: Some(first_assertion.assertion_id.clone()),
                    },
                    conflicting_results: results
                        .iter()
                        .map(|result| ResultRef::AssertionResult {
                            assertion_result_id: result.scenario_results[i].assertion_results[j]
                                .id
                                .clone(),
                        })
                        .collect(),
                });
            }
        }
    }
}

/// Describe the first shape difference between results, if any.
fn misalignment(results: &[TestResult]) -> Option<String> {
    let (first, rest) = results.split_first()?;

    for (offset, other) in rest.iter().enumerate() {
        let position = offset + 1;
        if other.scenario_results.len() != first.scenario_results.len() {
            return Some(format!(
                "result {position} has {} scenario results, expected {}",
                other.scenario_results.len(),
                first.scenario_results.len()
            ));
        }
        for (i, (expected, actual)) in first
            .scenario_results
            .iter()
            .zip(&other.scenario_results)
            .enumerate()
        {
            if actual.assertion_results.len() != expected.assertion_results.len() {
                return Some(format!(
                    "result {position} scenario {i} has {} assertion results, expected {}",
                    actual.assertion_results.len(),
                    expected.assertion_results.len()
                ));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflicts::fixtures::{definition, passing_result};
    use crate::model::{FailedReason, UnexpectedBehavior};

    fn group(results: Vec<TestResult>) -> TestResultGroup {
        TestResultGroup {
            test_id: results[0].test_id.clone(),
            results,
        }
    }

    #[test]
    fn agreeing_results_have_no_conflicts() {
        let test = definition("t1", 3, 2);
        let groups = vec![group(vec![passing_result(1, &test), passing_result(2, &test)])];
        let conflicts = locate_conflicts(&groups, MisalignmentPolicy::Error).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn scenario_level_conflict_on_unexpected_behaviors() {
        let test = definition("t1", 3, 2);
        let a = passing_result(1, &test);
        let mut b = passing_result(2, &test);
        b.scenario_results[2].unexpected_behaviors = vec![UnexpectedBehavior::ExcessivelyVerbose];

        let conflicts =
            locate_conflicts(&[group(vec![a, b])], MisalignmentPolicy::Error).unwrap();
        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.source.scenario_id, "t1-s2");
        assert!(conflict.source.assertion_id.is_none());
        assert_eq!(
            conflict.conflicting_results,
            vec![
                ResultRef::ScenarioResult {
                    scenario_result_id: "r1:t1:2".to_string()
                },
                ResultRef::ScenarioResult {
                    scenario_result_id: "r2:t1:2".to_string()
                },
            ]
        );
    }

    #[test]
    fn assertion_level_conflict_on_passed() {
        let test = definition("t1", 2, 2);
        let a = passing_result(1, &test);
        let mut b = passing_result(2, &test);
        b.scenario_results[0].assertion_results[1].passed = false;
        b.scenario_results[0].assertion_results[1].failed_reason =
            Some(FailedReason::IncorrectOutput);

        let conflicts =
            locate_conflicts(&[group(vec![a, b])], MisalignmentPolicy::Error).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].source.scenario_id, "t1-s0");
        assert_eq!(conflicts[0].source.assertion_id.as_deref(), Some("t1-a1"));
        assert!(conflicts[0].is_assertion_level());
        assert_eq!(
            conflicts[0].conflicting_results[1],
            ResultRef::AssertionResult {
                assertion_result_id: "r2:t1:0:1".to_string()
            }
        );
    }

    #[test]
    fn majority_does_not_suppress_conflict() {
        let test = definition("t1", 1, 1);
        let a = passing_result(1, &test);
        let b = passing_result(2, &test);
        let mut c = passing_result(3, &test);
        c.scenario_results[0].assertion_results[0].passed = false;

        let conflicts =
            locate_conflicts(&[group(vec![a, b, c])], MisalignmentPolicy::Error).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflicting_results.len(), 3);
    }

    #[test]
    fn scenario_and_assertion_conflicts_both_fire_in_order() {
        let test = definition("t1", 2, 2);
        let a = passing_result(1, &test);
        let mut b = passing_result(2, &test);
        b.scenario_results[1].unexpected_behaviors = vec![UnexpectedBehavior::Sluggish];
        b.scenario_results[1].assertion_results[0].passed = false;
        b.scenario_results[0].assertion_results[1].passed = false;

        let conflicts =
            locate_conflicts(&[group(vec![a, b])], MisalignmentPolicy::Error).unwrap();
        let sources: Vec<(&str, Option<&str>)> = conflicts
            .iter()
            .map(|c| (c.source.scenario_id.as_str(), c.source.assertion_id.as_deref()))
            .collect();
        assert_eq!(
            sources,
            vec![
                ("t1-s0", Some("t1-a1")),
                ("t1-s1", None),
                ("t1-s1", Some("t1-a0")),
            ]
        );
    }

    #[test]
    fn misaligned_results_error_by_default() {
        let test = definition("t1", 2, 1);
        let a = passing_result(1, &test);
        let mut b = passing_result(2, &test);
        b.scenario_results.pop();

        let err = locate_conflicts(&[group(vec![a, b])], MisalignmentPolicy::Error).unwrap_err();
        assert!(matches!(err, AriaError::MisalignedResults { ref test_id, .. } if test_id == "t1"));
    }

    #[test]
    fn misaligned_results_skip_only_that_test() {
        let bad = definition("bad", 1, 2);
        let good = definition("good", 1, 1);
        let a = passing_result(1, &bad);
        let mut b = passing_result(2, &bad);
        b.scenario_results[0].assertion_results.pop();
        let c = passing_result(1, &good);
        let mut d = passing_result(2, &good);
        d.scenario_results[0].assertion_results[0].passed = false;

        let conflicts = locate_conflicts(
            &[group(vec![a, b]), group(vec![c, d])],
            MisalignmentPolicy::Skip,
        )
        .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].test_id, "good");
    }
}
