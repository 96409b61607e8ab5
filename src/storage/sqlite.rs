//! `SQLite` storage implementation.

use crate::error::{AriaError, OptionExt, Result};
use crate::model::{ReportStatus, TestPlanReport, TestPlanRun, TestPlanTarget, TestPlanVersion, User};
use crate::storage::repository::{
    NewTestPlanRun, ReportFilter, Repository, RunFilter, Store, TestPlanReportRow, TestPlanRunRow,
};
use crate::storage::schema::apply_schema;
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open a new connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a new connection with an optional busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        apply_schema(&conn)?;
        debug!(path = %path.display(), "opened database");
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Repository access outside a transaction.
    #[must_use]
    pub const fn store(&self) -> Store<'_> {
        Store::new(&self.conn)
    }

    /// Run `f` inside one `IMMEDIATE` transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back otherwise.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a database error from begin/commit.
    pub fn transaction<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Store<'_>) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&Store::new(&tx));
        match result {
            Ok(value) => {
                tx.commit()?;
                debug!(op, "committed transaction");
                Ok(value)
            }
            Err(err) => {
                debug!(op, error = %err, "rolling back transaction");
                Err(err)
            }
        }
    }

    /// Load a report with its target, version and every run.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::NotFound` if the report does not exist.
    pub fn load_report(&self, id: i64) -> Result<TestPlanReport> {
        self.store().load_report(id)
    }

    /// Load every report matching `filter`, in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if any report fails to load.
    pub fn load_reports(&self, filter: &ReportFilter) -> Result<Vec<TestPlanReport>> {
        let store = self.store();
        Repository::<TestPlanReportRow>::find_many(&store, filter)?
            .into_iter()
            .map(|row| store.assemble_report(row))
            .collect()
    }

    /// Move a report to a new review status.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::NotFound` if the report does not exist.
    pub fn update_report_status(
        &mut self,
        report_id: i64,
        status: ReportStatus,
    ) -> Result<TestPlanReportRow> {
        self.transaction("update_report_status", |store| {
            let mut row = Repository::<TestPlanReportRow>::find(store, &report_id)?
                .or_not_found("test plan report", report_id)?;
            let previous = row.status;
            row.status = status;
            Repository::<TestPlanReportRow>::update(store, &row)?;
            info!(report_id, from = %previous, to = %status, "updated report status");
            Ok(row)
        })
    }

    /// Give `user_id` a run on the report unless they already have one.
    ///
    /// Returns the run and whether it was created.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::NotFound` if the report or user does not exist.
    pub fn assign_tester(&mut self, report_id: i64, user_id: i64) -> Result<(TestPlanRunRow, bool)> {
        self.transaction("assign_tester", |store| {
            Repository::<TestPlanReportRow>::find(store, &report_id)?
                .or_not_found("test plan report", report_id)?;
            Repository::<User>::find(store, &user_id)?.or_not_found("user", user_id)?;

            let existing = Repository::<TestPlanRunRow>::find_many(
                store,
                &RunFilter {
                    test_plan_report_id: Some(report_id),
                    tester_user_id: Some(user_id),
                },
            )?;
            if let Some(run) = existing.into_iter().next() {
                debug!(report_id, user_id, run_id = run.id, "tester already assigned");
                return Ok((run, false));
            }

            let run = Repository::<TestPlanRunRow>::create(
                store,
                &NewTestPlanRun {
                    test_plan_report_id: report_id,
                    tester_user_id: user_id,
                    test_results: Vec::new(),
                },
            )?;
            info!(report_id, user_id, run_id = run.id, "assigned tester");
            Ok((run, true))
        })
    }

    /// Delete the run `user_id` holds on the report.
    ///
    /// Returns whether a run was removed.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::NotFound` if the report does not exist.
    pub fn remove_tester(&mut self, report_id: i64, user_id: i64) -> Result<bool> {
        self.transaction("remove_tester", |store| {
            Repository::<TestPlanReportRow>::find(store, &report_id)?
                .or_not_found("test plan report", report_id)?;
            let runs = Repository::<TestPlanRunRow>::find_many(
                store,
                &RunFilter {
                    test_plan_report_id: Some(report_id),
                    tester_user_id: Some(user_id),
                },
            )?;
            let mut removed = false;
            for run in runs {
                removed |= Repository::<TestPlanRunRow>::remove(store, &run.id)?;
            }
            info!(report_id, user_id, removed, "removed tester");
            Ok(removed)
        })
    }

    /// Delete a report and all of its runs.
    ///
    /// Returns the number of runs removed.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::NotFound` if the report does not exist. Nothing is
    /// deleted when any step fails.
    pub fn delete_report(&mut self, report_id: i64) -> Result<usize> {
        self.transaction("delete_report", |store| {
            let runs = store.conn().execute(
                "DELETE FROM test_plan_runs WHERE test_plan_report_id = ?",
                [report_id],
            )?;
            if !Repository::<TestPlanReportRow>::remove(store, &report_id)? {
                return Err(AriaError::not_found("test plan report", report_id));
            }
            info!(report_id, runs, "deleted report");
            Ok(runs)
        })
    }
}

impl Store<'_> {
    /// Load a report graph through this store.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::NotFound` if the report or anything it references
    /// does not exist.
    pub fn load_report(&self, id: i64) -> Result<TestPlanReport> {
        let row = Repository::<TestPlanReportRow>::find(self, &id)?
            .or_not_found("test plan report", id)?;
        self.assemble_report(row)
    }

    fn assemble_report(&self, row: TestPlanReportRow) -> Result<TestPlanReport> {
        let test_plan_target = Repository::<TestPlanTarget>::find(self, &row.test_plan_target_id)?
            .or_not_found("test plan target", row.test_plan_target_id)?;
        let test_plan_version =
            Repository::<TestPlanVersion>::find(self, &row.test_plan_version_id)?
                .or_not_found("test plan version", row.test_plan_version_id)?;

        let run_rows = Repository::<TestPlanRunRow>::find_many(
            self,
            &RunFilter {
                test_plan_report_id: Some(row.id),
                ..RunFilter::default()
            },
        )?;
        let test_plan_runs = run_rows
            .into_iter()
            .map(|run| {
                let tester = Repository::<User>::find(self, &run.tester_user_id)?
                    .or_not_found("user", run.tester_user_id)?;
                Ok(TestPlanRun {
                    id: run.id,
                    tester,
                    test_results: run.test_results,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TestPlanReport {
            id: row.id,
            status: row.status,
            created_at: row.created_at,
            test_plan_target,
            test_plan_version,
            test_plan_runs,
        })
    }
}
