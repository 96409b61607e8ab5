use super::{open_context, print_json};
use crate::cli::ImportArgs;
use crate::config::CliOverrides;
use crate::error::{Result, ResultExt};
use crate::storage::ReportBundle;
use std::fs;

/// Execute the import command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if any record
/// in it is rejected. Nothing is imported in that case.
pub fn execute(args: &ImportArgs, cli: &CliOverrides) -> Result<()> {
    let mut ctx = open_context(cli)?;
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let bundle = ReportBundle::from_json(&text)?;
    let summary = ctx.storage.import_report_bundle(&bundle)?;

    if ctx.settings.json {
        return print_json(&summary);
    }

    println!(
        "Imported {} report(s) from {} ({} created)",
        summary.report_ids.len(),
        args.file.display(),
        summary.reports_created.len()
    );
    println!(
        "  ATs: {}  browsers: {}  users: {}  versions: {}",
        summary.ats_created, summary.browsers_created, summary.users_created, summary.versions_created
    );
    println!(
        "  runs: {} created, {} updated",
        summary.runs_created, summary.runs_updated
    );
    Ok(())
}
