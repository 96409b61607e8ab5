//! Per-entity repositories over a borrowed connection.

use crate::error::{AriaError, Result};
use crate::model::{
    At, AtVersion, Browser, BrowserVersion, ReportStatus, Test, TestPlanTarget, TestPlanVersion,
    TestResult, User,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, ToSql};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Page request. `page` is zero-based; negative pages clamp to the first.
/// A `limit` of zero or less returns every match on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 0, limit: 10 }
    }
}

/// One page of results. `page` is one-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub page: usize,
    pub page_size: Option<usize>,
    pub pages_count: usize,
    pub results_count: usize,
    pub total_results_count: usize,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// Cut one page out of the full, ordered result set.
    #[must_use]
    pub fn paginate(rows: Vec<T>, pagination: &Pagination) -> Self {
        let page = usize::try_from(pagination.page).unwrap_or(0);
        let limit = usize::try_from(pagination.limit).ok().filter(|&limit| limit > 0);
        let total_results_count = rows.len();

        let (data, pages_count): (Vec<T>, usize) = match limit {
            Some(limit) => (
                rows.into_iter()
                    .skip(page.saturating_mul(limit))
                    .take(limit)
                    .collect(),
                total_results_count.div_ceil(limit),
            ),
            None => (rows, 1),
        };

        Self {
            page: page + 1,
            page_size: limit,
            pages_count,
            results_count: data.len(),
            total_results_count,
            data,
        }
    }
}

/// Uniform data access for one entity kind.
pub trait Repository<E> {
    type Key;
    type Draft;
    type Filter: Default;

    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn find(&self, key: &Self::Key) -> Result<Option<E>>;

    /// All rows matching `filter`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn find_many(&self, filter: &Self::Filter) -> Result<Vec<E>>;

    /// # Errors
    ///
    /// Returns an error if the insert violates a constraint.
    fn create(&self, draft: &Self::Draft) -> Result<E>;

    /// Persist every mutable field of `entity`.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::NotFound` if the row does not exist.
    fn update(&self, entity: &E) -> Result<()>;

    /// Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete violates a constraint.
    fn remove(&self, key: &Self::Key) -> Result<bool>;

    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn find_page(&self, filter: &Self::Filter, pagination: &Pagination) -> Result<Page<E>> {
        Ok(Page::paginate(self.find_many(filter)?, pagination))
    }
}

/// Repository access over a connection or an open transaction.
#[derive(Debug, Clone, Copy)]
pub struct Store<'a> {
    conn: &'a Connection,
}

impl<'a> Store<'a> {
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub const fn conn(&self) -> &'a Connection {
        self.conn
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAt {
    /// Explicit id, or `None` to let the database assign one.
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBrowser {
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub id: Option<i64>,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTestPlanVersion {
    pub title: String,
    pub directory: String,
    pub git_sha: Option<String>,
    pub git_message: Option<String>,
    pub tests: Vec<Test>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTestPlanTarget {
    pub at_id: i64,
    pub at_version: String,
    pub browser_id: i64,
    pub browser_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTestPlanReport {
    pub status: ReportStatus,
    pub test_plan_target_id: i64,
    pub test_plan_version_id: i64,
    /// Defaults to now.
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTestPlanRun {
    pub test_plan_report_id: i64,
    pub tester_user_id: i64,
    pub test_results: Vec<TestResult>,
}

#[derive(Debug, Clone, Default)]
pub struct AtFilter {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BrowserFilter {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AtVersionFilter {
    pub at_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct BrowserVersionFilter {
    pub browser_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VersionFilter {
    pub directory: Option<String>,
    pub git_sha: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TargetFilter {
    pub at_id: Option<i64>,
    pub at_version: Option<String>,
    pub browser_id: Option<i64>,
    pub browser_version: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub test_plan_target_id: Option<i64>,
    pub test_plan_version_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub test_plan_report_id: Option<i64>,
    pub tester_user_id: Option<i64>,
}

/// A report row without its target, version or runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlanReportRow {
    pub id: i64,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub test_plan_target_id: i64,
    pub test_plan_version_id: i64,
}

/// A run row; the tester is referenced by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlanRunRow {
    pub id: i64,
    pub test_plan_report_id: i64,
    pub tester_user_id: i64,
    pub test_results: Vec<TestResult>,
}

/// SELECT with optional equality filters.
struct Query {
    sql: String,
    params: Vec<Box<dyn ToSql>>,
}

impl Query {
    fn new(select: &str) -> Self {
        Self {
            sql: format!("{select} WHERE 1=1"),
            params: Vec::new(),
        }
    }

    fn filter<T: ToSql + 'static>(&mut self, column: &str, value: Option<T>) {
        if let Some(value) = value {
            let _ = write!(self.sql, " AND {column} = ?");
            self.params.push(Box::new(value));
        }
    }

    fn fetch<T, F>(mut self, conn: &Connection, order_by: &str, map: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let _ = write!(self.sql, " ORDER BY {order_by}");
        let mut stmt = conn.prepare(&self.sql)?;
        let params_refs: Vec<&dyn ToSql> = self.params.iter().map(AsRef::as_ref).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| conversion_error(idx, err))
}

fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<ReportStatus> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|err: AriaError| conversion_error(idx, err))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|err| conversion_error(idx, err))
}

fn require_changed(changed: usize, kind: &'static str, id: impl ToString) -> Result<()> {
    if changed == 0 {
        return Err(AriaError::not_found(kind, id));
    }
    Ok(())
}

const AT_SELECT: &str = "SELECT id, name FROM ats";

fn at_from_row(row: &Row<'_>) -> rusqlite::Result<At> {
    Ok(At {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

impl Repository<At> for Store<'_> {
    type Key = i64;
    type Draft = NewAt;
    type Filter = AtFilter;

    fn find(&self, key: &i64) -> Result<Option<At>> {
        Ok(self
            .conn
            .query_row(&format!("{AT_SELECT} WHERE id = ?"), [key], at_from_row)
            .optional()?)
    }

    fn find_many(&self, filter: &AtFilter) -> Result<Vec<At>> {
        let mut query = Query::new(AT_SELECT);
        query.filter("name", filter.name.clone());
        query.fetch(self.conn, "id", at_from_row)
    }

    fn create(&self, draft: &NewAt) -> Result<At> {
        self.conn.execute(
            "INSERT INTO ats (id, name) VALUES (?, ?)",
            rusqlite::params![draft.id, draft.name],
        )?;
        Ok(At {
            id: self.conn.last_insert_rowid(),
            name: draft.name.clone(),
        })
    }

    fn update(&self, entity: &At) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE ats SET name = ? WHERE id = ?",
            rusqlite::params![entity.name, entity.id],
        )?;
        require_changed(changed, "at", entity.id)
    }

    fn remove(&self, key: &i64) -> Result<bool> {
        Ok(self.conn.execute("DELETE FROM ats WHERE id = ?", [key])? > 0)
    }
}

const BROWSER_SELECT: &str = "SELECT id, name FROM browsers";

fn browser_from_row(row: &Row<'_>) -> rusqlite::Result<Browser> {
    Ok(Browser {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

impl Repository<Browser> for Store<'_> {
    type Key = i64;
    type Draft = NewBrowser;
    type Filter = BrowserFilter;

    fn find(&self, key: &i64) -> Result<Option<Browser>> {
        Ok(self
            .conn
            .query_row(
                &format!("{BROWSER_SELECT} WHERE id = ?"),
                [key],
                browser_from_row,
            )
            .optional()?)
    }

    fn find_many(&self, filter: &BrowserFilter) -> Result<Vec<Browser>> {
        let mut query = Query::new(BROWSER_SELECT);
        query.filter("name", filter.name.clone());
        query.fetch(self.conn, "id", browser_from_row)
    }

    fn create(&self, draft: &NewBrowser) -> Result<Browser> {
        self.conn.execute(
            "INSERT INTO browsers (id, name) VALUES (?, ?)",
            rusqlite::params![draft.id, draft.name],
        )?;
        Ok(Browser {
            id: self.conn.last_insert_rowid(),
            name: draft.name.clone(),
        })
    }

    fn update(&self, entity: &Browser) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE browsers SET name = ? WHERE id = ?",
            rusqlite::params![entity.name, entity.id],
        )?;
        require_changed(changed, "browser", entity.id)
    }

    fn remove(&self, key: &i64) -> Result<bool> {
        Ok(self.conn.execute("DELETE FROM browsers WHERE id = ?", [key])? > 0)
    }
}

impl Repository<AtVersion> for Store<'_> {
    type Key = AtVersion;
    type Draft = AtVersion;
    type Filter = AtVersionFilter;

    fn find(&self, key: &AtVersion) -> Result<Option<AtVersion>> {
        Ok(self
            .conn
            .query_row(
                "SELECT at_id, version FROM at_versions WHERE at_id = ? AND version = ?",
                rusqlite::params![key.at_id, key.version],
                |row| {
                    Ok(AtVersion {
                        at_id: row.get(0)?,
                        version: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn find_many(&self, filter: &AtVersionFilter) -> Result<Vec<AtVersion>> {
        let mut query = Query::new("SELECT at_id, version FROM at_versions");
        query.filter("at_id", filter.at_id);
        query.fetch(self.conn, "at_id, rowid", |row| {
            Ok(AtVersion {
                at_id: row.get(0)?,
                version: row.get(1)?,
            })
        })
    }

    fn create(&self, draft: &AtVersion) -> Result<AtVersion> {
        self.conn.execute(
            "INSERT INTO at_versions (at_id, version) VALUES (?, ?)",
            rusqlite::params![draft.at_id, draft.version],
        )?;
        Ok(draft.clone())
    }

    /// Versions have no mutable fields; this only checks existence.
    fn update(&self, entity: &AtVersion) -> Result<()> {
        if Repository::<AtVersion>::find(self, entity)?.is_none() {
            return Err(AriaError::not_found(
                "at version",
                format!("{}@{}", entity.at_id, entity.version),
            ));
        }
        Ok(())
    }

    fn remove(&self, key: &AtVersion) -> Result<bool> {
        Ok(self.conn.execute(
            "DELETE FROM at_versions WHERE at_id = ? AND version = ?",
            rusqlite::params![key.at_id, key.version],
        )? > 0)
    }
}

impl Repository<BrowserVersion> for Store<'_> {
    type Key = BrowserVersion;
    type Draft = BrowserVersion;
    type Filter = BrowserVersionFilter;

    fn find(&self, key: &BrowserVersion) -> Result<Option<BrowserVersion>> {
        Ok(self
            .conn
            .query_row(
                "SELECT browser_id, version FROM browser_versions WHERE browser_id = ? AND version = ?",
                rusqlite::params![key.browser_id, key.version],
                |row| {
                    Ok(BrowserVersion {
                        browser_id: row.get(0)?,
                        version: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn find_many(&self, filter: &BrowserVersionFilter) -> Result<Vec<BrowserVersion>> {
        let mut query = Query::new("SELECT browser_id, version FROM browser_versions");
        query.filter("browser_id", filter.browser_id);
        query.fetch(self.conn, "browser_id, rowid", |row| {
            Ok(BrowserVersion {
                browser_id: row.get(0)?,
                version: row.get(1)?,
            })
        })
    }

    fn create(&self, draft: &BrowserVersion) -> Result<BrowserVersion> {
        self.conn.execute(
            "INSERT INTO browser_versions (browser_id, version) VALUES (?, ?)",
            rusqlite::params![draft.browser_id, draft.version],
        )?;
        Ok(draft.clone())
    }

    /// Versions have no mutable fields; this only checks existence.
    fn update(&self, entity: &BrowserVersion) -> Result<()> {
        if Repository::<BrowserVersion>::find(self, entity)?.is_none() {
            return Err(AriaError::not_found(
                "browser version",
                format!("{}@{}", entity.browser_id, entity.version),
            ));
        }
        Ok(())
    }

    fn remove(&self, key: &BrowserVersion) -> Result<bool> {
        Ok(self.conn.execute(
            "DELETE FROM browser_versions WHERE browser_id = ? AND version = ?",
            rusqlite::params![key.browser_id, key.version],
        )? > 0)
    }
}

const USER_SELECT: &str = "SELECT id, username FROM users";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
    })
}

impl Repository<User> for Store<'_> {
    type Key = i64;
    type Draft = NewUser;
    type Filter = UserFilter;

    fn find(&self, key: &i64) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(&format!("{USER_SELECT} WHERE id = ?"), [key], user_from_row)
            .optional()?)
    }

    fn find_many(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut query = Query::new(USER_SELECT);
        query.filter("username", filter.username.clone());
        query.fetch(self.conn, "id", user_from_row)
    }

    fn create(&self, draft: &NewUser) -> Result<User> {
        self.conn.execute(
            "INSERT INTO users (id, username) VALUES (?, ?)",
            rusqlite::params![draft.id, draft.username],
        )?;
        Ok(User {
            id: self.conn.last_insert_rowid(),
            username: draft.username.clone(),
        })
    }

    fn update(&self, entity: &User) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE users SET username = ? WHERE id = ?",
            rusqlite::params![entity.username, entity.id],
        )?;
        require_changed(changed, "user", entity.id)
    }

    fn remove(&self, key: &i64) -> Result<bool> {
        Ok(self.conn.execute("DELETE FROM users WHERE id = ?", [key])? > 0)
    }
}

const VERSION_SELECT: &str =
    "SELECT id, title, directory, git_sha, git_message, tests FROM test_plan_versions";

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<TestPlanVersion> {
    Ok(TestPlanVersion {
        id: row.get(0)?,
        title: row.get(1)?,
        directory: row.get(2)?,
        git_sha: row.get(3)?,
        git_message: row.get(4)?,
        tests: json_column(row, 5)?,
    })
}

impl Repository<TestPlanVersion> for Store<'_> {
    type Key = i64;
    type Draft = NewTestPlanVersion;
    type Filter = VersionFilter;

    fn find(&self, key: &i64) -> Result<Option<TestPlanVersion>> {
        Ok(self
            .conn
            .query_row(
                &format!("{VERSION_SELECT} WHERE id = ?"),
                [key],
                version_from_row,
            )
            .optional()?)
    }

    fn find_many(&self, filter: &VersionFilter) -> Result<Vec<TestPlanVersion>> {
        let mut query = Query::new(VERSION_SELECT);
        query.filter("directory", filter.directory.clone());
        query.filter("git_sha", filter.git_sha.clone());
        query.fetch(self.conn, "id", version_from_row)
    }

    fn create(&self, draft: &NewTestPlanVersion) -> Result<TestPlanVersion> {
        let tests = serde_json::to_string(&draft.tests)?;
        self.conn.execute(
            "INSERT INTO test_plan_versions (title, directory, git_sha, git_message, tests)
             VALUES (?, ?, ?, ?, ?)",
            rusqlite::params![
                draft.title,
                draft.directory,
                draft.git_sha,
                draft.git_message,
                tests
            ],
        )?;
        Ok(TestPlanVersion {
            id: self.conn.last_insert_rowid(),
            title: draft.title.clone(),
            directory: draft.directory.clone(),
            git_sha: draft.git_sha.clone(),
            git_message: draft.git_message.clone(),
            tests: draft.tests.clone(),
        })
    }

    fn update(&self, entity: &TestPlanVersion) -> Result<()> {
        let tests = serde_json::to_string(&entity.tests)?;
        let changed = self.conn.execute(
            "UPDATE test_plan_versions
             SET title = ?, directory = ?, git_sha = ?, git_message = ?, tests = ?
             WHERE id = ?",
            rusqlite::params![
                entity.title,
                entity.directory,
                entity.git_sha,
                entity.git_message,
                tests,
                entity.id
            ],
        )?;
        require_changed(changed, "test plan version", entity.id)
    }

    fn remove(&self, key: &i64) -> Result<bool> {
        Ok(self
            .conn
            .execute("DELETE FROM test_plan_versions WHERE id = ?", [key])?
            > 0)
    }
}

const TARGET_SELECT: &str = "SELECT t.id, t.at_id, a.name, t.at_version, t.browser_id, b.name, t.browser_version
     FROM test_plan_targets t
     JOIN ats a ON a.id = t.at_id
     JOIN browsers b ON b.id = t.browser_id";

fn target_from_row(row: &Row<'_>) -> rusqlite::Result<TestPlanTarget> {
    Ok(TestPlanTarget {
        id: row.get(0)?,
        at: At {
            id: row.get(1)?,
            name: row.get(2)?,
        },
        at_version: row.get(3)?,
        browser: Browser {
            id: row.get(4)?,
            name: row.get(5)?,
        },
        browser_version: row.get(6)?,
    })
}

impl Repository<TestPlanTarget> for Store<'_> {
    type Key = i64;
    type Draft = NewTestPlanTarget;
    type Filter = TargetFilter;

    fn find(&self, key: &i64) -> Result<Option<TestPlanTarget>> {
        Ok(self
            .conn
            .query_row(
                &format!("{TARGET_SELECT} WHERE t.id = ?"),
                [key],
                target_from_row,
            )
            .optional()?)
    }

    fn find_many(&self, filter: &TargetFilter) -> Result<Vec<TestPlanTarget>> {
        let mut query = Query::new(TARGET_SELECT);
        query.filter("t.at_id", filter.at_id);
        query.filter("t.at_version", filter.at_version.clone());
        query.filter("t.browser_id", filter.browser_id);
        query.filter("t.browser_version", filter.browser_version.clone());
        query.fetch(self.conn, "t.id", target_from_row)
    }

    fn create(&self, draft: &NewTestPlanTarget) -> Result<TestPlanTarget> {
        self.conn.execute(
            "INSERT INTO test_plan_targets (at_id, at_version, browser_id, browser_version)
             VALUES (?, ?, ?, ?)",
            rusqlite::params![
                draft.at_id,
                draft.at_version,
                draft.browser_id,
                draft.browser_version
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        Repository::<TestPlanTarget>::find(self, &id)?
            .ok_or_else(|| AriaError::not_found("test plan target", id))
    }

    fn update(&self, entity: &TestPlanTarget) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE test_plan_targets
             SET at_id = ?, at_version = ?, browser_id = ?, browser_version = ?
             WHERE id = ?",
            rusqlite::params![
                entity.at.id,
                entity.at_version,
                entity.browser.id,
                entity.browser_version,
                entity.id
            ],
        )?;
        require_changed(changed, "test plan target", entity.id)
    }

    fn remove(&self, key: &i64) -> Result<bool> {
        Ok(self
            .conn
            .execute("DELETE FROM test_plan_targets WHERE id = ?", [key])?
            > 0)
    }
}

const REPORT_SELECT: &str = "SELECT id, status, created_at, test_plan_target_id, test_plan_version_id
     FROM test_plan_reports";

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<TestPlanReportRow> {
    Ok(TestPlanReportRow {
        id: row.get(0)?,
        status: status_column(row, 1)?,
        created_at: timestamp_column(row, 2)?,
        test_plan_target_id: row.get(3)?,
        test_plan_version_id: row.get(4)?,
    })
}

impl Repository<TestPlanReportRow> for Store<'_> {
    type Key = i64;
    type Draft = NewTestPlanReport;
    type Filter = ReportFilter;

    fn find(&self, key: &i64) -> Result<Option<TestPlanReportRow>> {
        Ok(self
            .conn
            .query_row(
                &format!("{REPORT_SELECT} WHERE id = ?"),
                [key],
                report_from_row,
            )
            .optional()?)
    }

    fn find_many(&self, filter: &ReportFilter) -> Result<Vec<TestPlanReportRow>> {
        let mut query = Query::new(REPORT_SELECT);
        query.filter("status", filter.status.map(|s| s.as_str()));
        query.filter("test_plan_target_id", filter.test_plan_target_id);
        query.filter("test_plan_version_id", filter.test_plan_version_id);
        query.fetch(self.conn, "id", report_from_row)
    }

    fn create(&self, draft: &NewTestPlanReport) -> Result<TestPlanReportRow> {
        let created_at = draft.created_at.unwrap_or_else(Utc::now);
        self.conn.execute(
            "INSERT INTO test_plan_reports (status, test_plan_target_id, test_plan_version_id, created_at)
             VALUES (?, ?, ?, ?)",
            rusqlite::params![
                draft.status.as_str(),
                draft.test_plan_target_id,
                draft.test_plan_version_id,
                created_at.to_rfc3339()
            ],
        )?;
        Ok(TestPlanReportRow {
            id: self.conn.last_insert_rowid(),
            status: draft.status,
            created_at,
            test_plan_target_id: draft.test_plan_target_id,
            test_plan_version_id: draft.test_plan_version_id,
        })
    }

    fn update(&self, entity: &TestPlanReportRow) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE test_plan_reports
             SET status = ?, test_plan_target_id = ?, test_plan_version_id = ?
             WHERE id = ?",
            rusqlite::params![
                entity.status.as_str(),
                entity.test_plan_target_id,
                entity.test_plan_version_id,
                entity.id
            ],
        )?;
        require_changed(changed, "test plan report", entity.id)
    }

    fn remove(&self, key: &i64) -> Result<bool> {
        Ok(self
            .conn
            .execute("DELETE FROM test_plan_reports WHERE id = ?", [key])?
            > 0)
    }
}

const RUN_SELECT: &str =
    "SELECT id, test_plan_report_id, tester_user_id, test_results FROM test_plan_runs";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<TestPlanRunRow> {
    Ok(TestPlanRunRow {
        id: row.get(0)?,
        test_plan_report_id: row.get(1)?,
        tester_user_id: row.get(2)?,
        test_results: json_column(row, 3)?,
    })
}

impl Repository<TestPlanRunRow> for Store<'_> {
    type Key = i64;
    type Draft = NewTestPlanRun;
    type Filter = RunFilter;

    fn find(&self, key: &i64) -> Result<Option<TestPlanRunRow>> {
        Ok(self
            .conn
            .query_row(&format!("{RUN_SELECT} WHERE id = ?"), [key], run_from_row)
            .optional()?)
    }

    fn find_many(&self, filter: &RunFilter) -> Result<Vec<TestPlanRunRow>> {
        let mut query = Query::new(RUN_SELECT);
        query.filter("test_plan_report_id", filter.test_plan_report_id);
        query.filter("tester_user_id", filter.tester_user_id);
        query.fetch(self.conn, "id", run_from_row)
    }

    fn create(&self, draft: &NewTestPlanRun) -> Result<TestPlanRunRow> {
        let results = serde_json::to_string(&draft.test_results)?;
        self.conn.execute(
            "INSERT INTO test_plan_runs (test_plan_report_id, tester_user_id, test_results)
             VALUES (?, ?, ?)",
            rusqlite::params![draft.test_plan_report_id, draft.tester_user_id, results],
        )?;
        Ok(TestPlanRunRow {
            id: self.conn.last_insert_rowid(),
            test_plan_report_id: draft.test_plan_report_id,
            tester_user_id: draft.tester_user_id,
            test_results: draft.test_results.clone(),
        })
    }

    fn update(&self, entity: &TestPlanRunRow) -> Result<()> {
        let results = serde_json::to_string(&entity.test_results)?;
        let changed = self.conn.execute(
            "UPDATE test_plan_runs
             SET test_plan_report_id = ?, tester_user_id = ?, test_results = ?
             WHERE id = ?",
            rusqlite::params![
                entity.test_plan_report_id,
                entity.tester_user_id,
                results,
                entity.id
            ],
        )?;
        require_changed(changed, "test plan run", entity.id)
    }

    fn remove(&self, key: &i64) -> Result<bool> {
        Ok(self
            .conn
            .execute("DELETE FROM test_plan_runs WHERE id = ?", [key])?
            > 0)
    }
}
