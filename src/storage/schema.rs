//! Database schema definitions.

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the report database.
pub const SCHEMA_SQL: &str = r"
    -- Assistive technologies and browsers
    CREATE TABLE IF NOT EXISTS ats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        CHECK (length(name) >= 1)
    );

    CREATE TABLE IF NOT EXISTS browsers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        CHECK (length(name) >= 1)
    );

    CREATE TABLE IF NOT EXISTS at_versions (
        at_id INTEGER NOT NULL,
        version TEXT NOT NULL,
        PRIMARY KEY (at_id, version),
        FOREIGN KEY (at_id) REFERENCES ats(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS browser_versions (
        browser_id INTEGER NOT NULL,
        version TEXT NOT NULL,
        PRIMARY KEY (browser_id, version),
        FOREIGN KEY (browser_id) REFERENCES browsers(id) ON DELETE CASCADE
    );

    -- Testers
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        CHECK (length(username) >= 1)
    );

    -- Test plan snapshots; test definitions are stored as a JSON array
    CREATE TABLE IF NOT EXISTS test_plan_versions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        directory TEXT NOT NULL DEFAULT '',
        git_sha TEXT,
        git_message TEXT,
        tests TEXT NOT NULL DEFAULT '[]'
    );
    CREATE INDEX IF NOT EXISTS idx_test_plan_versions_directory ON test_plan_versions(directory);

    CREATE TABLE IF NOT EXISTS test_plan_targets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        at_id INTEGER NOT NULL,
        at_version TEXT NOT NULL,
        browser_id INTEGER NOT NULL,
        browser_version TEXT NOT NULL,
        UNIQUE (at_id, at_version, browser_id, browser_version),
        FOREIGN KEY (at_id, at_version) REFERENCES at_versions(at_id, version),
        FOREIGN KEY (browser_id, browser_version) REFERENCES browser_versions(browser_id, version)
    );

    CREATE TABLE IF NOT EXISTS test_plan_reports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        status TEXT NOT NULL DEFAULT 'DRAFT',
        test_plan_target_id INTEGER NOT NULL,
        test_plan_version_id INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        CHECK (status IN ('DRAFT', 'IN_REVIEW', 'FINALIZED')),
        FOREIGN KEY (test_plan_target_id) REFERENCES test_plan_targets(id),
        FOREIGN KEY (test_plan_version_id) REFERENCES test_plan_versions(id)
    );
    CREATE INDEX IF NOT EXISTS idx_test_plan_reports_status ON test_plan_reports(status);
    CREATE INDEX IF NOT EXISTS idx_test_plan_reports_target ON test_plan_reports(test_plan_target_id);

    -- One run per tester per report; results are a JSON array
    CREATE TABLE IF NOT EXISTS test_plan_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        test_plan_report_id INTEGER NOT NULL,
        tester_user_id INTEGER NOT NULL,
        test_results TEXT NOT NULL DEFAULT '[]',
        UNIQUE (test_plan_report_id, tester_user_id),
        FOREIGN KEY (test_plan_report_id) REFERENCES test_plan_reports(id),
        FOREIGN KEY (tester_user_id) REFERENCES users(id)
    );
    CREATE INDEX IF NOT EXISTS idx_test_plan_runs_report ON test_plan_runs(test_plan_report_id);
";

/// Apply the schema to the database.
///
/// Idempotent: every statement uses `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set journal mode to WAL for concurrency
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Runs may not outlive their report, and targets need known versions
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;

    Ok(())
}
