use super::{open_context, print_json, settings_without_workspace};
use crate::cli::ConflictsArgs;
use crate::config::{CliOverrides, Settings};
use crate::conflicts::{
    ReportPopulator, conflict_count, detect_conflicts, ensure_unique_result_ids,
};
use crate::error::{AriaError, Result, ResultExt};
use crate::format::{ConflictsOutput, TextFormatOptions, format_conflicts};
use crate::model::TestPlanReport;
use futures::executor::block_on;
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Execute the conflicts command.
///
/// # Errors
///
/// Returns `AriaError::MisalignedResults` under the `error` policy when a
/// test's results differ in shape, `AriaError::StaleReference` if a result
/// cannot be resolved, or a load error for the report.
pub fn execute(args: &ConflictsArgs, cli: &CliOverrides, text: TextFormatOptions) -> Result<()> {
    let (settings, report) = match &args.file {
        Some(path) => (settings_without_workspace(cli)?, read_report(path, args.report)?),
        None => {
            let ctx = open_context(cli)?;
            let report = ctx.storage.load_report(args.report)?;
            (ctx.settings, report)
        }
    };
    run(args, &settings, &report, text)
}

fn read_report(path: &Path, expected_id: i64) -> Result<TestPlanReport> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let report: TestPlanReport = serde_json::from_str(&text)?;
    if report.id != expected_id {
        return Err(AriaError::validation(
            "report",
            format!(
                "{} holds test plan report {}, not {expected_id}",
                path.display(),
                report.id
            ),
        ));
    }
    ensure_unique_result_ids(&report)?;
    debug!(path = %path.display(), report_id = report.id, "read report from file");
    Ok(report)
}

fn run(
    args: &ConflictsArgs,
    settings: &Settings,
    report: &TestPlanReport,
    text: TextFormatOptions,
) -> Result<()> {
    let options = settings.detect_options();

    if args.count {
        let count = conflict_count(report, &settings.assembler, &options)?;
        if settings.json {
            return print_json(&json!({ "report_id": report.id, "conflict_count": count }));
        }
        println!("{count}");
        return Ok(());
    }

    let conflicts = block_on(detect_conflicts(
        report,
        &settings.assembler,
        &ReportPopulator,
        &options,
    ))?;

    if settings.json {
        return print_json(&ConflictsOutput::new(report.id, conflicts));
    }
    println!("{}", format_conflicts(&conflicts, text));
    Ok(())
}
