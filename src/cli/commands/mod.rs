//! Command implementations.
//!
//! Each command resolves settings through [`config`], opens storage when it
//! needs it, and prints either text or JSON on stdout.

pub mod completions;
pub mod conflicts;
pub mod delete;
pub mod import;
pub mod init;
pub mod provision;
pub mod reports;
pub mod show;
pub mod status;
pub mod tester;

use crate::config::{self, CliOverrides, Settings};
use crate::error::{AriaError, Result};
use crate::format::TextFormatOptions;
use crate::model::User;
use crate::storage::{Repository, SqliteStorage, UserFilter};
use serde::Serialize;
use std::path::Path;

/// Settings and storage for a command running inside a workspace.
pub struct CommandContext {
    pub settings: Settings,
    pub storage: SqliteStorage,
}

/// Discover the workspace, resolve settings and open its database.
///
/// # Errors
///
/// Returns `AriaError::NotInitialized` outside a workspace, or
/// `AriaError::DatabaseNotFound` if the database file is missing.
pub fn open_context(cli: &CliOverrides) -> Result<CommandContext> {
    let workspace_dir = config::discover_workspace_dir(None)?;
    let settings = config::load_settings(&workspace_dir, cli)?;
    let storage = config::open_storage(&settings)?;
    Ok(CommandContext { settings, storage })
}

/// Resolve settings without requiring an initialized workspace.
///
/// # Errors
///
/// Returns an error if config cannot be loaded or a value is invalid.
pub fn settings_without_workspace(cli: &CliOverrides) -> Result<Settings> {
    match config::discover_workspace_dir(None) {
        Ok(dir) => config::load_settings(&dir, cli),
        Err(AriaError::NotInitialized) => {
            config::load_settings(Path::new(config::WORKSPACE_DIR_NAME), cli)
        }
        Err(err) => Err(err),
    }
}

/// Look a tester up by numeric id, falling back to username.
///
/// # Errors
///
/// Returns `AriaError::NotFound` if no such user exists.
pub fn resolve_user(storage: &SqliteStorage, user: &str) -> Result<User> {
    let store = storage.store();
    if let Ok(id) = user.trim().parse::<i64>() {
        if let Some(found) = Repository::<User>::find(&store, &id)? {
            return Ok(found);
        }
    }
    let filter = UserFilter {
        username: Some(user.trim().to_string()),
    };
    Repository::<User>::find_many(&store, &filter)?
        .into_iter()
        .next()
        .ok_or_else(|| AriaError::not_found("user", user))
}

/// Print `value` as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Text options for stdout, honoring `--no-color` and non-terminal output.
#[must_use]
pub fn stdout_text_options(no_color: bool) -> TextFormatOptions {
    use std::io::IsTerminal;

    let is_tty = std::io::stdout().is_terminal();
    TextFormatOptions {
        use_color: is_tty && !no_color && std::env::var_os("NO_COLOR").is_none(),
        max_width: is_tty.then(crate::format::terminal_width),
    }
}
