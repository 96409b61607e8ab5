//! Ordered find-or-create of everything a new report needs.

use crate::error::{OptionExt, Result};
use crate::model::{At, AtVersion, Browser, BrowserVersion, ReportStatus, TestPlanTarget, TestPlanVersion};
use crate::storage::repository::{
    NewTestPlanReport, NewTestPlanTarget, ReportFilter, Repository, Store, TargetFilter,
    TestPlanReportRow,
};
use crate::storage::sqlite::SqliteStorage;
use serde::Serialize;
use tracing::{debug, info};

/// What to provision: a report for `test_plan_version_id` against the given
/// AT and browser versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub at_id: i64,
    pub at_version: String,
    pub browser_id: i64,
    pub browser_version: String,
    pub test_plan_version_id: i64,
}

/// An entity together with whether this request created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provisioned<T> {
    pub entity: T,
    pub created: bool,
}

/// A row that did not exist before the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CreatedLocation {
    AtVersion { at_id: i64, version: String },
    BrowserVersion { browser_id: i64, version: String },
    TestPlanTarget { id: i64 },
    TestPlanReport { id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionOutcome {
    pub at_version: Provisioned<AtVersion>,
    pub browser_version: Provisioned<BrowserVersion>,
    pub test_plan_target: Provisioned<TestPlanTarget>,
    pub test_plan_report: Provisioned<TestPlanReportRow>,
    pub created: Vec<CreatedLocation>,
}

fn find_or_create<T, F, C>(find: F, create: C) -> Result<Provisioned<T>>
where
    F: FnOnce() -> Result<Option<T>>,
    C: FnOnce() -> Result<T>,
{
    if let Some(entity) = find()? {
        return Ok(Provisioned {
            entity,
            created: false,
        });
    }
    Ok(Provisioned {
        entity: create()?,
        created: true,
    })
}

/// Run every step against `store`; each step sees the previous ones.
pub(crate) fn provision_in(store: &Store<'_>, request: &ProvisionRequest) -> Result<ProvisionOutcome> {
    Repository::<At>::find(store, &request.at_id)?.or_not_found("at", request.at_id)?;
    Repository::<Browser>::find(store, &request.browser_id)?
        .or_not_found("browser", request.browser_id)?;
    Repository::<TestPlanVersion>::find(store, &request.test_plan_version_id)?
        .or_not_found("test plan version", request.test_plan_version_id)?;

    let mut created = Vec::new();

    let at_version = AtVersion {
        at_id: request.at_id,
        version: request.at_version.clone(),
    };
    let at_version = find_or_create(
        || Repository::<AtVersion>::find(store, &at_version),
        || Repository::<AtVersion>::create(store, &at_version),
    )?;
    if at_version.created {
        created.push(CreatedLocation::AtVersion {
            at_id: at_version.entity.at_id,
            version: at_version.entity.version.clone(),
        });
    }

    let browser_version = BrowserVersion {
        browser_id: request.browser_id,
        version: request.browser_version.clone(),
    };
    let browser_version = find_or_create(
        || Repository::<BrowserVersion>::find(store, &browser_version),
        || Repository::<BrowserVersion>::create(store, &browser_version),
    )?;
    if browser_version.created {
        created.push(CreatedLocation::BrowserVersion {
            browser_id: browser_version.entity.browser_id,
            version: browser_version.entity.version.clone(),
        });
    }

    let test_plan_target = find_or_create(
        || {
            let filter = TargetFilter {
                at_id: Some(request.at_id),
                at_version: Some(request.at_version.clone()),
                browser_id: Some(request.browser_id),
                browser_version: Some(request.browser_version.clone()),
            };
            Ok(Repository::<TestPlanTarget>::find_many(store, &filter)?
                .into_iter()
                .next())
        },
        || {
            Repository::<TestPlanTarget>::create(
                store,
                &NewTestPlanTarget {
                    at_id: request.at_id,
                    at_version: request.at_version.clone(),
                    browser_id: request.browser_id,
                    browser_version: request.browser_version.clone(),
                },
            )
        },
    )?;
    if test_plan_target.created {
        created.push(CreatedLocation::TestPlanTarget {
            id: test_plan_target.entity.id,
        });
    }

    let target_id = test_plan_target.entity.id;
    let test_plan_report = find_or_create(
        || {
            let filter = ReportFilter {
                test_plan_target_id: Some(target_id),
                test_plan_version_id: Some(request.test_plan_version_id),
                ..ReportFilter::default()
            };
            Ok(Repository::<TestPlanReportRow>::find_many(store, &filter)?
                .into_iter()
                .next())
        },
        || {
            Repository::<TestPlanReportRow>::create(
                store,
                &NewTestPlanReport {
                    status: ReportStatus::Draft,
                    test_plan_target_id: target_id,
                    test_plan_version_id: request.test_plan_version_id,
                    created_at: None,
                },
            )
        },
    )?;
    if test_plan_report.created {
        created.push(CreatedLocation::TestPlanReport {
            id: test_plan_report.entity.id,
        });
    }

    debug!(created = created.len(), "provisioning steps complete");
    Ok(ProvisionOutcome {
        at_version,
        browser_version,
        test_plan_target,
        test_plan_report,
        created,
    })
}

impl SqliteStorage {
    /// Find or create the AT version, browser version, target and report for
    /// `request`, all in one transaction.
    ///
    /// A repeated request finds everything and creates nothing.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::NotFound` if the AT, browser or test plan version
    /// does not exist. Nothing is written when any step fails.
    pub fn provision_report(&mut self, request: &ProvisionRequest) -> Result<ProvisionOutcome> {
        let outcome = self.transaction("provision_report", |store| provision_in(store, request))?;
        info!(
            report_id = outcome.test_plan_report.entity.id,
            created = outcome.created.len(),
            "provisioned report"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AriaError;
    use crate::storage::repository::{NewAt, NewBrowser, NewTestPlanVersion};

    fn storage() -> (SqliteStorage, ProvisionRequest) {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let request = storage
            .transaction("seed", |store| {
                let at = Repository::<At>::create(
                    store,
                    &NewAt {
                        id: None,
                        name: "VoiceOver for macOS".to_string(),
                    },
                )?;
                let browser = Repository::<Browser>::create(
                    store,
                    &NewBrowser {
                        id: None,
                        name: "Safari".to_string(),
                    },
                )?;
                let version = Repository::<TestPlanVersion>::create(
                    store,
                    &NewTestPlanVersion {
                        title: "Combobox".to_string(),
                        directory: "combobox-autocomplete-list".to_string(),
                        ..NewTestPlanVersion::default()
                    },
                )?;
                Ok(ProvisionRequest {
                    at_id: at.id,
                    at_version: "11.5.2".to_string(),
                    browser_id: browser.id,
                    browser_version: "14.1.2".to_string(),
                    test_plan_version_id: version.id,
                })
            })
            .unwrap();
        (storage, request)
    }

    #[test]
    fn first_request_creates_every_step_in_order() {
        let (mut storage, request) = storage();
        let outcome = storage.provision_report(&request).unwrap();

        assert!(outcome.at_version.created);
        assert!(outcome.browser_version.created);
        assert!(outcome.test_plan_target.created);
        assert!(outcome.test_plan_report.created);
        assert_eq!(outcome.test_plan_report.entity.status, ReportStatus::Draft);
        assert_eq!(outcome.created.len(), 4);
        assert!(matches!(outcome.created[0], CreatedLocation::AtVersion { .. }));
        assert!(matches!(outcome.created[3], CreatedLocation::TestPlanReport { .. }));
        assert_eq!(
            outcome.test_plan_target.entity.title(),
            "VoiceOver for macOS 11.5.2 with Safari 14.1.2"
        );
    }

    #[test]
    fn repeated_request_creates_nothing() {
        let (mut storage, request) = storage();
        let first = storage.provision_report(&request).unwrap();
        let second = storage.provision_report(&request).unwrap();

        assert!(second.created.is_empty());
        assert!(!second.test_plan_report.created);
        assert_eq!(
            first.test_plan_report.entity.id,
            second.test_plan_report.entity.id
        );
        assert_eq!(first.test_plan_target.entity, second.test_plan_target.entity);
    }

    #[test]
    fn new_browser_version_reuses_at_version() {
        let (mut storage, request) = storage();
        storage.provision_report(&request).unwrap();
        let newer = ProvisionRequest {
            browser_version: "15.0".to_string(),
            ..request
        };
        let outcome = storage.provision_report(&newer).unwrap();

        assert!(!outcome.at_version.created);
        assert!(outcome.browser_version.created);
        assert!(outcome.test_plan_target.created);
        assert_eq!(outcome.created.len(), 3);
    }

    #[test]
    fn unknown_version_fails_without_writes() {
        let (mut storage, request) = storage();
        let bad = ProvisionRequest {
            test_plan_version_id: 404,
            ..request
        };
        let err = storage.provision_report(&bad).unwrap_err();
        assert!(matches!(err, AriaError::NotFound { kind: "test plan version", .. }));

        let versions = Repository::<AtVersion>::find_many(&storage.store(), &Default::default())
            .unwrap();
        assert!(versions.is_empty());
    }
}
