//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Assistive-technology test report store with tester conflict detection
#[derive(Parser, Debug)]
#[command(name = "aat", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (defaults to .aria-at/aria-at.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// `SQLite` busy timeout in ms
    #[arg(long, global = true)]
    pub lock_timeout: Option<u64>,

    /// How to treat finalized results of different shape (error, skip)
    #[arg(long, global = true)]
    pub misaligned: Option<String>,

    /// Which results of a run to compare (stored, runnable)
    #[arg(long, global = true)]
    pub assembler: Option<String>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Also append JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize an aria-at workspace
    Init {
        /// Overwrite existing DB
        #[arg(long)]
        force: bool,
    },

    /// Import ATs, browsers, users, test plan versions and reports from a JSON bundle
    Import(ImportArgs),

    /// List test plan reports with their conflict counts
    #[command(alias = "list")]
    Reports(ReportsArgs),

    /// Show one report
    Show {
        /// Report id
        report: i64,
    },

    /// Detect conflicts between testers' results
    Conflicts(ConflictsArgs),

    /// Find or create the target and report for an AT/browser pairing
    Provision(ProvisionArgs),

    /// Change a report's review status
    Status {
        /// Report id
        report: i64,
        /// New status (DRAFT, IN_REVIEW, FINALIZED)
        status: String,
    },

    /// Give a tester a run on a report
    Assign(TesterArgs),

    /// Remove a tester's run from a report
    Unassign(TesterArgs),

    /// Delete a report and all of its runs
    Delete {
        /// Report id
        report: i64,
    },

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Bundle file (JSON)
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ReportsArgs {
    /// Only reports with this status
    #[arg(long)]
    pub status: Option<String>,

    /// Zero-based page number
    #[arg(long, default_value_t = 0)]
    pub page: i64,

    /// Page size (0 = no pagination)
    #[arg(long, default_value_t = 10)]
    pub limit: i64,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConflictsArgs {
    /// Report id
    pub report: i64,

    /// Read the report graph from a JSON file instead of the database
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Print only the number of conflicts
    #[arg(long)]
    pub count: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ProvisionArgs {
    /// AT id
    #[arg(long)]
    pub at_id: i64,

    /// AT version, e.g. 2020.4
    #[arg(long)]
    pub at_version: String,

    /// Browser id
    #[arg(long)]
    pub browser_id: i64,

    /// Browser version, e.g. 88.0
    #[arg(long)]
    pub browser_version: String,

    /// Test plan version id
    #[arg(long)]
    pub version_id: i64,
}

#[derive(Args, Debug, Clone)]
pub struct TesterArgs {
    /// Report id
    pub report: i64,

    /// Tester username or user id
    pub user: String,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ShellType {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    #[value(name = "powershell")]
    #[value(alias = "pwsh")]
    /// `PowerShell`
    PowerShell,
    /// Elvish
    Elvish,
}
