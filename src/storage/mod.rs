//! Storage layer for the report graph.
//!
//! `SqliteStorage` owns the connection. Every entity table is reached
//! through a [`Store`], which implements [`Repository`] once per entity, so
//! the same code runs against a plain connection or an open transaction.

pub mod bundle;
pub mod provision;
pub mod repository;
pub mod schema;
pub mod sqlite;

pub use bundle::{BundleProduct, BundleReport, BundleRun, BundleVersion, ImportSummary, ReportBundle};
pub use provision::{CreatedLocation, ProvisionOutcome, ProvisionRequest, Provisioned};
pub use repository::{
    AtFilter, AtVersionFilter, BrowserFilter, BrowserVersionFilter, NewAt, NewBrowser,
    NewTestPlanReport, NewTestPlanRun, NewTestPlanTarget, NewTestPlanVersion, NewUser, Page,
    Pagination, Repository, ReportFilter, RunFilter, Store, TargetFilter, TestPlanReportRow,
    TestPlanRunRow, UserFilter, VersionFilter,
};
pub use sqlite::SqliteStorage;
