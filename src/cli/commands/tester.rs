//! `assign` and `unassign`: manage which testers hold a run on a report.

use super::{open_context, print_json, resolve_user};
use crate::cli::TesterArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use serde_json::json;

/// Execute the assign command.
///
/// # Errors
///
/// Returns `AriaError::NotFound` if the report or user does not exist.
pub fn assign(args: &TesterArgs, cli: &CliOverrides) -> Result<()> {
    let mut ctx = open_context(cli)?;
    let user = resolve_user(&ctx.storage, &args.user)?;
    let (run, created) = ctx.storage.assign_tester(args.report, user.id)?;

    if ctx.settings.json {
        return print_json(&json!({
            "test_plan_run_id": run.id,
            "test_plan_report_id": run.test_plan_report_id,
            "tester": user,
            "created": created,
        }));
    }
    if created {
        println!("Assigned {} to report #{} (run #{})", user.username, args.report, run.id);
    } else {
        println!("{} already has run #{} on report #{}", user.username, run.id, args.report);
    }
    Ok(())
}

/// Execute the unassign command.
///
/// # Errors
///
/// Returns `AriaError::NotFound` if the report or user does not exist.
pub fn unassign(args: &TesterArgs, cli: &CliOverrides) -> Result<()> {
    let mut ctx = open_context(cli)?;
    let user = resolve_user(&ctx.storage, &args.user)?;
    let removed = ctx.storage.remove_tester(args.report, user.id)?;

    if ctx.settings.json {
        return print_json(&json!({
            "test_plan_report_id": args.report,
            "tester": user,
            "removed": removed,
        }));
    }
    if removed {
        println!("Removed {}'s run from report #{}", user.username, args.report);
    } else {
        println!("{} has no run on report #{}", user.username, args.report);
    }
    Ok(())
}
