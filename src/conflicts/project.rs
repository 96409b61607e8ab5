//! Projection of results onto the fields that count as disagreement.
//!
//! Scenario results compare on their unexpected behaviors only; the free-text
//! `output` never takes part. Assertion results compare on `passed` and
//! `failed_reason`. Any other field may differ between testers freely.

use crate::model::{AssertionResult, FailedReason, ScenarioResult, UnexpectedBehavior};
use std::collections::BTreeSet;

/// Comparison view of a scenario result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioProjection<'a> {
    /// Compared as a set: order and duplicates do not matter.
    pub unexpected_behaviors: BTreeSet<&'a UnexpectedBehavior>,
}

/// Comparison view of an assertion result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionProjection<'a> {
    pub passed: bool,
    pub failed_reason: Option<&'a FailedReason>,
}

#[must_use]
pub fn project_scenario(result: &ScenarioResult) -> ScenarioProjection<'_> {
    ScenarioProjection {
        unexpected_behaviors: result.unexpected_behaviors.iter().collect(),
    }
}

#[must_use]
pub fn project_assertion(result: &AssertionResult) -> AssertionProjection<'_> {
    AssertionProjection {
        passed: result.passed,
        failed_reason: result.failed_reason.as_ref(),
    }
}
