use aria_at_rust::cli::commands;
use aria_at_rust::cli::{Cli, Commands};
use aria_at_rust::config;
use aria_at_rust::logging::init_logging;
use aria_at_rust::{AriaError, StructuredError};
use clap::Parser;
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let overrides = build_cli_overrides(&cli);
    let text = commands::stdout_text_options(cli.no_color);

    let result = match &cli.command {
        Commands::Init { force } => commands::init::execute(*force, None),
        Commands::Import(args) => commands::import::execute(args, &overrides),
        Commands::Reports(args) => commands::reports::execute(args, &overrides, text),
        Commands::Show { report } => commands::show::execute(*report, &overrides, text),
        Commands::Conflicts(args) => commands::conflicts::execute(args, &overrides, text),
        Commands::Provision(args) => commands::provision::execute(args, &overrides),
        Commands::Status { report, status } => {
            commands::status::execute(*report, status, &overrides)
        }
        Commands::Assign(args) => commands::tester::assign(args, &overrides),
        Commands::Unassign(args) => commands::tester::unassign(args, &overrides),
        Commands::Delete { report } => commands::delete::execute(*report, &overrides),
        Commands::Completions(args) => commands::completions::execute(args),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &AriaError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}

fn build_cli_overrides(cli: &Cli) -> config::CliOverrides {
    config::CliOverrides {
        db: cli.db.clone(),
        json: cli.json.then_some(true),
        lock_timeout: cli.lock_timeout,
        misaligned: cli.misaligned.clone(),
        assembler: cli.assembler.clone(),
    }
}
