use super::{open_context, print_json};
use crate::config::CliOverrides;
use crate::error::Result;
use serde_json::json;

/// Execute the delete command.
///
/// # Errors
///
/// Returns `AriaError::NotFound` if the report does not exist.
pub fn execute(report_id: i64, cli: &CliOverrides) -> Result<()> {
    let mut ctx = open_context(cli)?;
    let runs_removed = ctx.storage.delete_report(report_id)?;

    if ctx.settings.json {
        return print_json(&json!({
            "test_plan_report_id": report_id,
            "runs_removed": runs_removed,
        }));
    }
    println!("Deleted report #{report_id} and {runs_removed} run(s)");
    Ok(())
}
