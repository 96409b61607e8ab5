use super::{open_context, print_json};
use crate::cli::ProvisionArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::storage::{CreatedLocation, ProvisionRequest};

/// Execute the provision command.
///
/// # Errors
///
/// Returns `AriaError::NotFound` if the AT, browser or test plan version
/// does not exist.
pub fn execute(args: &ProvisionArgs, cli: &CliOverrides) -> Result<()> {
    let mut ctx = open_context(cli)?;
    let request = ProvisionRequest {
        at_id: args.at_id,
        at_version: args.at_version.clone(),
        browser_id: args.browser_id,
        browser_version: args.browser_version.clone(),
        test_plan_version_id: args.version_id,
    };
    let outcome = ctx.storage.provision_report(&request)?;

    if ctx.settings.json {
        return print_json(&outcome);
    }

    let report = &outcome.test_plan_report;
    println!(
        "{} report #{} for {} [{}]",
        if report.created { "Created" } else { "Found" },
        report.entity.id,
        outcome.test_plan_target.entity.title(),
        report.entity.status
    );
    for location in &outcome.created {
        println!("  created {}", describe(location));
    }
    Ok(())
}

fn describe(location: &CreatedLocation) -> String {
    match location {
        CreatedLocation::AtVersion { at_id, version } => format!("AT {at_id} version {version}"),
        CreatedLocation::BrowserVersion {
            browser_id,
            version,
        } => format!("browser {browser_id} version {version}"),
        CreatedLocation::TestPlanTarget { id } => format!("test plan target #{id}"),
        CreatedLocation::TestPlanReport { id } => format!("test plan report #{id}"),
    }
}
