//! JSON report bundles: a self-contained export of ATs, browsers, testers,
//! test plan versions and reports with their runs.
//!
//! Importing is idempotent for everything except run contents, which are
//! replaced by what the bundle carries.

use crate::error::{AriaError, OptionExt, Result};
use crate::model::{
    At, AtVersion, Browser, BrowserVersion, ReportStatus, Test, TestPlanVersion, TestResult, User,
    duplicate_result_id,
};
use crate::storage::provision::{ProvisionRequest, provision_in};
use crate::storage::repository::{
    AtFilter, BrowserFilter, NewAt, NewBrowser, NewTestPlanRun, NewTestPlanVersion, NewUser,
    Repository, RunFilter, Store, TestPlanReportRow, TestPlanRunRow, UserFilter, VersionFilter,
};
use crate::storage::sqlite::SqliteStorage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// An AT or browser with its known versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleProduct {
    /// Keeps ids stable across databases so `at_ids` in test definitions hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleVersion {
    pub title: String,
    pub directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_message: Option<String>,
    #[serde(default)]
    pub tests: Vec<Test>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRun {
    /// Username of the tester.
    pub tester: String,
    #[serde(default)]
    pub test_results: Vec<TestResult>,
}

/// A report referencing bundle entities by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleReport {
    #[serde(default)]
    pub status: ReportStatus,
    /// Directory of the test plan version.
    pub directory: String,
    /// Narrows `directory` to one revision; the newest is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
    pub at: String,
    pub at_version: String,
    pub browser: String,
    pub browser_version: String,
    #[serde(default)]
    pub runs: Vec<BundleRun>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBundle {
    #[serde(default)]
    pub ats: Vec<BundleProduct>,
    #[serde(default)]
    pub browsers: Vec<BundleProduct>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub test_plan_versions: Vec<BundleVersion>,
    #[serde(default)]
    pub test_plan_reports: Vec<BundleReport>,
}

impl ReportBundle {
    /// Parse a bundle from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::Json` on malformed input.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub ats_created: usize,
    pub browsers_created: usize,
    pub users_created: usize,
    pub versions_created: usize,
    pub runs_created: usize,
    pub runs_updated: usize,
    /// Ids of every report in the bundle, in bundle order.
    pub report_ids: Vec<i64>,
    /// Ids of the reports this import created.
    pub reports_created: Vec<i64>,
}

impl SqliteStorage {
    /// Import a bundle in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::Validation` when the bundle contradicts itself or
    /// the database, and `AriaError::NotFound` when a report references an
    /// entity the bundle does not define. Nothing is written on error.
    pub fn import_report_bundle(&mut self, bundle: &ReportBundle) -> Result<ImportSummary> {
        let summary = self.transaction("import_report_bundle", |store| import_in(store, bundle))?;
        info!(
            reports = summary.report_ids.len(),
            created = summary.reports_created.len(),
            runs_created = summary.runs_created,
            runs_updated = summary.runs_updated,
            "imported report bundle"
        );
        Ok(summary)
    }
}

fn import_in(store: &Store<'_>, bundle: &ReportBundle) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for product in &bundle.ats {
        let (at, created) = ensure_at(store, product)?;
        summary.ats_created += usize::from(created);
        for version in &product.versions {
            ensure_at_version(store, at.id, version)?;
        }
    }

    for product in &bundle.browsers {
        let (browser, created) = ensure_browser(store, product)?;
        summary.browsers_created += usize::from(created);
        for version in &product.versions {
            ensure_browser_version(store, browser.id, version)?;
        }
    }

    for username in &bundle.users {
        let (_, created) = ensure_user(store, username)?;
        summary.users_created += usize::from(created);
    }

    for version in &bundle.test_plan_versions {
        summary.versions_created += usize::from(ensure_version(store, version)?);
    }

    for report in &bundle.test_plan_reports {
        import_report(store, report, &mut summary)?;
    }

    Ok(summary)
}

fn ensure_at(store: &Store<'_>, product: &BundleProduct) -> Result<(At, bool)> {
    let filter = AtFilter {
        name: Some(product.name.clone()),
    };
    if let Some(existing) = Repository::<At>::find_many(store, &filter)?.into_iter().next() {
        check_stable_id("ats", &product.name, product.id, existing.id)?;
        return Ok((existing, false));
    }
    let at = Repository::<At>::create(
        store,
        &NewAt {
            id: product.id,
            name: product.name.clone(),
        },
    )?;
    Ok((at, true))
}

fn ensure_browser(store: &Store<'_>, product: &BundleProduct) -> Result<(Browser, bool)> {
    let filter = BrowserFilter {
        name: Some(product.name.clone()),
    };
    if let Some(existing) = Repository::<Browser>::find_many(store, &filter)?
        .into_iter()
        .next()
    {
        check_stable_id("browsers", &product.name, product.id, existing.id)?;
        return Ok((existing, false));
    }
    let browser = Repository::<Browser>::create(
        store,
        &NewBrowser {
            id: product.id,
            name: product.name.clone(),
        },
    )?;
    Ok((browser, true))
}

fn check_stable_id(field: &str, name: &str, wanted: Option<i64>, actual: i64) -> Result<()> {
    match wanted {
        Some(wanted) if wanted != actual => Err(AriaError::validation(
            field,
            format!("'{name}' has id {actual} in the database but {wanted} in the bundle"),
        )),
        _ => Ok(()),
    }
}

fn ensure_at_version(store: &Store<'_>, at_id: i64, version: &str) -> Result<()> {
    let key = AtVersion {
        at_id,
        version: version.to_string(),
    };
    if Repository::<AtVersion>::find(store, &key)?.is_none() {
        Repository::<AtVersion>::create(store, &key)?;
    }
    Ok(())
}

fn ensure_browser_version(store: &Store<'_>, browser_id: i64, version: &str) -> Result<()> {
    let key = BrowserVersion {
        browser_id,
        version: version.to_string(),
    };
    if Repository::<BrowserVersion>::find(store, &key)?.is_none() {
        Repository::<BrowserVersion>::create(store, &key)?;
    }
    Ok(())
}

fn ensure_user(store: &Store<'_>, username: &str) -> Result<(User, bool)> {
    let filter = UserFilter {
        username: Some(username.to_string()),
    };
    if let Some(existing) = Repository::<User>::find_many(store, &filter)?.into_iter().next() {
        return Ok((existing, false));
    }
    let user = Repository::<User>::create(
        store,
        &NewUser {
            id: None,
            username: username.to_string(),
        },
    )?;
    Ok((user, true))
}

/// Returns whether the version was created.
fn ensure_version(store: &Store<'_>, version: &BundleVersion) -> Result<bool> {
    let filter = VersionFilter {
        directory: Some(version.directory.clone()),
        git_sha: version.git_sha.clone(),
    };
    // Without a sha, any version in the directory counts as the same one
    if !Repository::<TestPlanVersion>::find_many(store, &filter)?.is_empty() {
        return Ok(false);
    }
    Repository::<TestPlanVersion>::create(
        store,
        &NewTestPlanVersion {
            title: version.title.clone(),
            directory: version.directory.clone(),
            git_sha: version.git_sha.clone(),
            git_message: version.git_message.clone(),
            tests: version.tests.clone(),
        },
    )?;
    Ok(true)
}

fn resolve_version(store: &Store<'_>, report: &BundleReport) -> Result<TestPlanVersion> {
    let filter = VersionFilter {
        directory: Some(report.directory.clone()),
        git_sha: report.git_sha.clone(),
    };
    Repository::<TestPlanVersion>::find_many(store, &filter)?
        .into_iter()
        .max_by_key(|v| v.id)
        .or_not_found("test plan version", &report.directory)
}

fn import_report(
    store: &Store<'_>,
    report: &BundleReport,
    summary: &mut ImportSummary,
) -> Result<()> {
    let version = resolve_version(store, report)?;
    let at = Repository::<At>::find_many(
        store,
        &AtFilter {
            name: Some(report.at.clone()),
        },
    )?
    .into_iter()
    .next()
    .or_not_found("at", &report.at)?;
    let browser = Repository::<Browser>::find_many(
        store,
        &BrowserFilter {
            name: Some(report.browser.clone()),
        },
    )?
    .into_iter()
    .next()
    .or_not_found("browser", &report.browser)?;

    let outcome = provision_in(
        store,
        &ProvisionRequest {
            at_id: at.id,
            at_version: report.at_version.clone(),
            browser_id: browser.id,
            browser_version: report.browser_version.clone(),
            test_plan_version_id: version.id,
        },
    )?;
    let mut row: TestPlanReportRow = outcome.test_plan_report.entity;
    if outcome.test_plan_report.created {
        summary.reports_created.push(row.id);
    }
    if row.status != report.status {
        row.status = report.status;
        Repository::<TestPlanReportRow>::update(store, &row)?;
    }

    for run in &report.runs {
        validate_results(&version, &run.tester, &run.test_results)?;
        let (tester, _) = ensure_user(store, &run.tester)?;
        let existing = Repository::<TestPlanRunRow>::find_many(
            store,
            &RunFilter {
                test_plan_report_id: Some(row.id),
                tester_user_id: Some(tester.id),
            },
        )?;
        if let Some(mut current) = existing.into_iter().next() {
            current.test_results.clone_from(&run.test_results);
            Repository::<TestPlanRunRow>::update(store, &current)?;
            summary.runs_updated += 1;
        } else {
            Repository::<TestPlanRunRow>::create(
                store,
                &NewTestPlanRun {
                    test_plan_report_id: row.id,
                    tester_user_id: tester.id,
                    test_results: run.test_results.clone(),
                },
            )?;
            summary.runs_created += 1;
        }
    }

    let runs = Repository::<TestPlanRunRow>::find_many(
        store,
        &RunFilter {
            test_plan_report_id: Some(row.id),
            tester_user_id: None,
        },
    )?;
    if let Some(id) = duplicate_result_id(runs.iter().flat_map(|run| &run.test_results)) {
        return Err(AriaError::validation(
            "test_results",
            format!("test plan report {} uses result id '{id}' more than once", row.id),
        ));
    }

    debug!(report_id = row.id, runs = report.runs.len(), "imported report");
    summary.report_ids.push(row.id);
    Ok(())
}

/// Every result must point at definitions from the report's version.
fn validate_results(version: &TestPlanVersion, tester: &str, results: &[TestResult]) -> Result<()> {
    for result in results {
        let test = version.test(&result.test_id).ok_or_else(|| {
            AriaError::validation(
                "test_results",
                format!(
                    "{tester}: result '{}' references unknown test '{}'",
                    result.id, result.test_id
                ),
            )
        })?;
        for scenario_result in &result.scenario_results {
            if test.scenario(&scenario_result.scenario_id).is_none() {
                return Err(AriaError::validation(
                    "scenario_results",
                    format!(
                        "{tester}: '{}' references unknown scenario '{}'",
                        scenario_result.id, scenario_result.scenario_id
                    ),
                ));
            }
            for assertion_result in &scenario_result.assertion_results {
                if test.assertion(&assertion_result.assertion_id).is_none() {
                    return Err(AriaError::validation(
                        "assertion_results",
                        format!(
                            "{tester}: '{}' references unknown assertion '{}'",
                            assertion_result.id, assertion_result.assertion_id
                        ),
                    ));
                }
            }
        }
    }
    Ok(())
}
