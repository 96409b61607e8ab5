use super::{open_context, print_json};
use crate::cli::ReportsArgs;
use crate::config::CliOverrides;
use crate::conflicts::conflict_count;
use crate::error::Result;
use crate::format::{ReportListing, TextFormatOptions, format_report_line_with};
use crate::model::ReportStatus;
use crate::storage::{Page, Pagination, ReportFilter};
use tracing::debug;

/// Execute the reports command.
///
/// # Errors
///
/// Returns an error if the status is invalid, a report fails to load, or
/// conflict counting fails under the configured misalignment policy.
pub fn execute(args: &ReportsArgs, cli: &CliOverrides, text: TextFormatOptions) -> Result<()> {
    let ctx = open_context(cli)?;
    let filter = ReportFilter {
        status: args
            .status
            .as_deref()
            .map(str::parse::<ReportStatus>)
            .transpose()?,
        ..ReportFilter::default()
    };

    let options = ctx.settings.detect_options();
    let listings = ctx
        .storage
        .load_reports(&filter)?
        .iter()
        .map(|report| {
            let count = conflict_count(report, &ctx.settings.assembler, &options)?;
            Ok(ReportListing::from_report(report, count))
        })
        .collect::<Result<Vec<_>>>()?;

    let page = Page::paginate(
        listings,
        &Pagination {
            page: args.page,
            limit: args.limit,
        },
    );
    debug!(
        page = page.page,
        results = page.results_count,
        total = page.total_results_count,
        "listed reports"
    );

    if ctx.settings.json {
        return print_json(&page);
    }

    if page.data.is_empty() {
        println!("No reports found.");
        return Ok(());
    }
    for listing in &page.data {
        println!("{}", format_report_line_with(listing, text));
    }
    if page.pages_count > 1 {
        println!(
            "Page {} of {} ({} reports)",
            page.page, page.pages_count, page.total_results_count
        );
    }
    Ok(())
}
