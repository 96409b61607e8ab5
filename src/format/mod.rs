//! Output formatting for `aria_at_rust`.
//!
//! Supports human-readable text output and machine-parseable JSON.
//!
//! # Output Types
//!
//! - [`ReportListing`] - Report with target, version and run counts (reports/show)
//! - [`ConflictsOutput`] - Conflicts for one report (conflicts)

mod output;
mod text;

pub use output::{ConflictsOutput, ReportListing, RunListing, TargetListing, VersionListing};
pub use text::{
    FINGERPRINT_PREFIX_LEN, TextFormatOptions, format_conflict, format_conflicts,
    format_report_details, format_report_line, format_report_line_with, format_status_label,
    terminal_width, truncate_title,
};
