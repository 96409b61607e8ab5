use crate::config::{DEFAULT_DB_FILENAME, WORKSPACE_DIR_NAME};
use crate::error::{AriaError, Result};
use crate::storage::SqliteStorage;
use std::fs;
use std::path::Path;
use tracing::info;

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the directory or database cannot be created.
pub fn execute(force: bool, root_dir: Option<&Path>) -> Result<()> {
    let base_dir = root_dir.unwrap_or_else(|| Path::new("."));
    let workspace_dir = base_dir.join(WORKSPACE_DIR_NAME);
    let db_path = workspace_dir.join(DEFAULT_DB_FILENAME);

    if workspace_dir.exists() {
        if db_path.exists() && !force {
            return Err(AriaError::AlreadyInitialized { path: db_path });
        }
        if db_path.exists() {
            fs::remove_file(&db_path)?;
        }
    } else {
        fs::create_dir(&workspace_dir)?;
    }

    // Creates the file and applies the schema.
    SqliteStorage::open(&db_path)?;

    let config_path = workspace_dir.join("config.yaml");
    if !config_path.exists() {
        let config = r"# aria-at workspace configuration
# db: aria-at.db
# misaligned-results: error   # or skip
# assembler: stored           # or runnable
# lock-timeout: 30000
";
        fs::write(config_path, config)?;
    }

    let gitignore_path = workspace_dir.join(".gitignore");
    if !gitignore_path.exists() {
        let gitignore = r"# Database
*.db
*.db-shm
*.db-wal
";
        fs::write(gitignore_path, gitignore)?;
    }

    info!(path = %db_path.display(), "initialized workspace");
    println!("Initialized aria-at workspace in {WORKSPACE_DIR_NAME}/");
    Ok(())
}
