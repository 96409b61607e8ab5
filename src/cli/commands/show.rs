use super::{open_context, print_json};
use crate::config::CliOverrides;
use crate::conflicts::conflict_count;
use crate::error::Result;
use crate::format::{ReportListing, TextFormatOptions, format_report_details};

/// Execute the show command.
///
/// JSON output is the full report graph plus its conflict count.
///
/// # Errors
///
/// Returns `AriaError::NotFound` if the report does not exist.
pub fn execute(report_id: i64, cli: &CliOverrides, text: TextFormatOptions) -> Result<()> {
    let ctx = open_context(cli)?;
    let report = ctx.storage.load_report(report_id)?;
    let count = conflict_count(&report, &ctx.settings.assembler, &ctx.settings.detect_options())?;

    if ctx.settings.json {
        let mut value = serde_json::to_value(&report)?;
        if let Some(object) = value.as_object_mut() {
            object.insert("conflict_count".to_string(), count.into());
        }
        return print_json(&value);
    }

    print!(
        "{}",
        format_report_details(&ReportListing::from_report(&report, count), text)
    );
    Ok(())
}
