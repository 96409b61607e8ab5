//! `aria_at_rust` - assistive-technology test report store with tester
//! conflict detection.
//!
//! The [`conflicts`] engine compares testers' finalized results for the same
//! test and reports every scenario or assertion where they disagree.
//! [`storage`] keeps the report graph in `SQLite`; [`cli`] exposes both as
//! the `aat` binary.

pub mod cli;
pub mod config;
pub mod conflicts;
pub mod error;
pub mod format;
pub mod logging;
pub mod model;
pub mod storage;

pub use error::{AriaError, ErrorCode, Result, StructuredError};
