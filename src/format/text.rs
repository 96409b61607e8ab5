//! Text formatting functions for `aria_at_rust`.
//!
//! Provides terminal output for report listings and conflict blocks. Color
//! is applied through `crossterm` only when the caller asks for it.

use super::output::ReportListing;
use crate::conflicts::{ConflictRecord, PopulatedData};
use crate::model::{ReportStatus, Scenario};
use crossterm::style::Stylize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Number of fingerprint characters shown in text output.
pub const FINGERPRINT_PREFIX_LEN: usize = 12;

/// Formatting options for text output.
#[derive(Debug, Clone, Copy)]
pub struct TextFormatOptions {
    pub use_color: bool,
    pub max_width: Option<usize>,
}

impl TextFormatOptions {
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            use_color: false,
            max_width: None,
        }
    }
}

/// Format status label with optional color.
#[must_use]
pub fn format_status_label(status: ReportStatus, use_color: bool) -> String {
    let label = status.as_str();
    if !use_color {
        return label.to_string();
    }

    match status {
        ReportStatus::Draft => label.yellow().to_string(),
        ReportStatus::InReview => label.cyan().to_string(),
        ReportStatus::Finalized => label.green().to_string(),
    }
}

/// Determine terminal width from environment (falls back to 80).
#[must_use]
pub fn terminal_width() -> usize {
    if let Ok(columns) = std::env::var("COLUMNS") {
        if let Ok(value) = columns.trim().parse::<usize>() {
            if value > 0 {
                return value;
            }
        }
    }
    80
}

/// Truncate a title to fit within `max_len` visible columns.
///
/// Handles wide characters (emojis, CJK) correctly using `unicode-width`.
#[must_use]
pub fn truncate_title(title: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(title) <= max_len {
        return title.to_string();
    }

    let (budget, suffix) = if max_len <= 3 {
        (max_len, "")
    } else {
        (max_len - 3, "...")
    };
    let mut width = 0;
    let mut out = String::new();
    for c in title.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw > budget {
            break;
        }
        width += cw;
        out.push(c);
    }
    out.push_str(suffix);
    out
}

/// Format a single-line report summary with options.
///
/// Format: `#{id} {status} runs:{n} conflicts:{n} {version} / {target}`
#[must_use]
pub fn format_report_line_with(listing: &ReportListing, options: TextFormatOptions) -> String {
    let status = listing.status.as_str();
    let counts = format!(
        "runs:{} conflicts:{}",
        listing.run_count(),
        listing.conflict_count
    );
    let prefix = format!("#{} {status} {counts} ", listing.id);
    let title = format!("{} / {}", listing.version.title, listing.target.title);
    let title = options.max_width.map_or_else(
        || title.clone(),
        |width| truncate_title(&title, width.saturating_sub(UnicodeWidthStr::width(prefix.as_str()))),
    );

    let status = format_status_label(listing.status, options.use_color);
    let counts = if options.use_color && listing.conflict_count > 0 {
        counts.red().to_string()
    } else {
        counts
    };
    format!("#{} {status} {counts} {title}", listing.id)
}

/// Format a single-line report summary.
#[must_use]
pub fn format_report_line(listing: &ReportListing) -> String {
    format_report_line_with(listing, TextFormatOptions::plain())
}

/// Multi-line report summary for `aat show`.
#[must_use]
pub fn format_report_details(listing: &ReportListing, options: TextFormatOptions) -> String {
    let mut out = format!(
        "Report #{} [{}]\n",
        listing.id,
        format_status_label(listing.status, options.use_color)
    );
    out.push_str(&format!("  Plan: {}", listing.version.title));
    if let Some(sha) = &listing.version.git_sha {
        out.push_str(&format!(" ({sha})"));
    }
    out.push('\n');
    out.push_str(&format!("  Target: {}\n", listing.target.title));
    out.push_str(&format!("  Tests: {}\n", listing.test_count));
    out.push_str(&format!("  Conflicts: {}\n", listing.conflict_count));
    if listing.draft_runs.is_empty() {
        out.push_str("  Runs: none\n");
        return out;
    }
    out.push_str("  Runs:\n");
    for run in &listing.draft_runs {
        out.push_str(&format!(
            "    #{} {}: {}/{} results complete\n",
            run.id, run.tester, run.test_result_count, listing.test_count
        ));
    }
    out
}

fn format_commands(scenario: Option<&Scenario>) -> String {
    scenario.map_or_else(
        || "(unknown scenario)".to_string(),
        |scenario| scenario.commands.join(", then "),
    )
}

/// One tester's side of a conflict.
fn format_verdict(data: &PopulatedData, use_color: bool) -> String {
    let tester = data.tester().unwrap_or("(unknown tester)");

    let verdict = if let Some(result) = &data.assertion_result {
        match (result.passed, &result.failed_reason) {
            (true, _) if use_color => "PASS".green().to_string(),
            (true, _) => "PASS".to_string(),
            (false, reason) => {
                let label = reason
                    .as_ref()
                    .map_or_else(|| "FAIL".to_string(), |r| format!("FAIL ({r})"));
                if use_color { label.red().to_string() } else { label }
            }
        }
    } else {
        let behaviors = data
            .scenario_result
            .as_ref()
            .map(|s| s.unexpected_behaviors.as_slice())
            .unwrap_or_default();
        if behaviors.is_empty() {
            "no unexpected behaviors".to_string()
        } else {
            let list = behaviors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("unexpected behaviors: {list}")
        }
    };

    let mut line = format!("    {tester}: {verdict}");
    if let Some(output) = data.scenario_result.as_ref().and_then(|s| s.output.as_deref()) {
        line.push_str(&format!("\n      output: {output:?}"));
    }
    line
}

/// Format one conflict block.
#[must_use]
pub fn format_conflict(record: &ConflictRecord, options: TextFormatOptions) -> String {
    let fingerprint: String = record
        .fingerprint
        .chars()
        .take(FINGERPRINT_PREFIX_LEN)
        .collect();
    let fingerprint = if options.use_color {
        fingerprint.dark_grey().to_string()
    } else {
        fingerprint
    };
    let title = record.source.test.as_ref().map_or_else(
        || record.test_id.clone(),
        |test| format!("{} (row {})", test.title, test.row_number),
    );

    let mut lines = vec![
        format!("{fingerprint} {title}"),
        format!("  Scenario: {}", format_commands(record.source.scenario.as_ref())),
    ];
    if let Some(assertion) = &record.source.assertion {
        lines.push(format!("  Assertion: {}", assertion.text));
    } else if record.is_assertion_level() {
        lines.push("  Assertion: (unknown assertion)".to_string());
    }
    for result in &record.conflicting_results {
        lines.push(format_verdict(result, options.use_color));
    }
    lines.join("\n")
}

/// Format every conflict, separated by blank lines.
#[must_use]
pub fn format_conflicts(records: &[ConflictRecord], options: TextFormatOptions) -> String {
    if records.is_empty() {
        return "No conflicts found.".to_string();
    }
    let header = if records.len() == 1 {
        "1 conflict:".to_string()
    } else {
        format!("{} conflicts:", records.len())
    };
    let blocks = records
        .iter()
        .map(|record| format_conflict(record, options))
        .collect::<Vec<_>>();
    format!("{header}\n\n{}", blocks.join("\n\n"))
}
