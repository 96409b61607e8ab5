use super::{open_context, print_json};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::model::ReportStatus;

/// Execute the status command.
///
/// # Errors
///
/// Returns `AriaError::InvalidStatus` for an unknown status, or
/// `AriaError::NotFound` if the report does not exist.
pub fn execute(report_id: i64, status: &str, cli: &CliOverrides) -> Result<()> {
    let status: ReportStatus = status.parse()?;
    let mut ctx = open_context(cli)?;
    let row = ctx.storage.update_report_status(report_id, status)?;

    if ctx.settings.json {
        return print_json(&row);
    }
    println!("Report #{} is now {}", row.id, row.status);
    Ok(())
}
