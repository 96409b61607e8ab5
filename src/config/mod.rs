//! Configuration management for `aria_at_rust`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`AAT_*`)
//! 3. Project config (.aria-at/config.yaml)
//! 4. User config (~/.config/aria-at/config.yaml)
//! 5. Defaults

use crate::conflicts::{AssemblerKind, DetectOptions, MisalignmentPolicy};
use crate::error::{AriaError, Result};
use crate::storage::SqliteStorage;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the workspace directory.
pub const WORKSPACE_DIR_NAME: &str = ".aria-at";
/// Database filename inside the workspace directory.
pub const DEFAULT_DB_FILENAME: &str = "aria-at.db";
/// Busy timeout used when nothing else is configured.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;

const ENV_PREFIX: &str = "AAT_";
const WORKSPACE_ENV: &str = "ARIA_AT_DIR";

/// A flat key/value configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(env::vars())
    }

    /// Build a layer from `AAT_*` variables; `AAT_LOCK_TIMEOUT` maps to `lock-timeout`.
    #[must_use]
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.set(stripped, value);
            }
        }
        layer
    }

    /// Insert a value under its normalized key.
    pub fn set(&mut self, key: &str, value: String) {
        self.values.insert(normalize_key(key), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&normalize_key(key))
            .map(String::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db: Option<PathBuf>,
    pub json: Option<bool>,
    pub lock_timeout: Option<u64>,
    pub misaligned: Option<String>,
    pub assembler: Option<String>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(path) = &self.db {
            layer.set("db", path.to_string_lossy().to_string());
        }
        if let Some(json) = self.json {
            layer.set("json", json.to_string());
        }
        if let Some(lock_timeout) = self.lock_timeout {
            layer.set("lock-timeout", lock_timeout.to_string());
        }
        if let Some(policy) = &self.misaligned {
            layer.set("misaligned-results", policy.clone());
        }
        if let Some(assembler) = &self.assembler {
            layer.set("assembler", assembler.clone());
        }

        layer
    }
}

/// Settings resolved from the merged layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub lock_timeout_ms: u64,
    pub json: bool,
    pub misaligned: MisalignmentPolicy,
    pub assembler: AssemblerKind,
}

impl Settings {
    /// Resolve settings for `workspace_dir`. Relative `db` values are taken
    /// relative to the workspace directory.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::Config` for unparseable values.
    pub fn from_layer(layer: &ConfigLayer, workspace_dir: &Path) -> Result<Self> {
        let db_path = layer.get("db").map_or_else(
            || workspace_dir.join(DEFAULT_DB_FILENAME),
            |value| {
                let candidate = PathBuf::from(value);
                if candidate.is_absolute() {
                    candidate
                } else {
                    workspace_dir.join(candidate)
                }
            },
        );

        let lock_timeout_ms = match layer.get("lock-timeout") {
            Some(value) => value.parse::<u64>().map_err(|_| {
                AriaError::Config(format!("lock-timeout must be milliseconds, got '{value}'"))
            })?,
            None => DEFAULT_LOCK_TIMEOUT_MS,
        };

        let json = match layer.get("json") {
            Some(value) => parse_bool(value)
                .ok_or_else(|| AriaError::Config(format!("json must be a boolean, got '{value}'")))?,
            None => false,
        };

        let misaligned = layer
            .get("misaligned-results")
            .map(str::parse::<MisalignmentPolicy>)
            .transpose()?
            .unwrap_or_default();
        let assembler = layer
            .get("assembler")
            .map(str::parse::<AssemblerKind>)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            db_path,
            lock_timeout_ms,
            json,
            misaligned,
            assembler,
        })
    }

    #[must_use]
    pub const fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            misaligned: self.misaligned,
        }
    }
}

/// Discover the active `.aria-at` directory.
///
/// Honors `ARIA_AT_DIR` when set, otherwise walks up from `start` (or CWD).
///
/// # Errors
///
/// Returns `AriaError::NotInitialized` if no workspace directory is found.
pub fn discover_workspace_dir(start: Option<&Path>) -> Result<PathBuf> {
    let env_override = env::var(WORKSPACE_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);
    discover_workspace_dir_with_env(start, env_override.as_deref())
}

fn discover_workspace_dir_with_env(
    start: Option<&Path>,
    env_override: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = env_override {
        if path.is_dir() {
            return Ok(path.to_path_buf());
        }
    }

    let mut current = match start {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };

    loop {
        let candidate = current.join(WORKSPACE_DIR_NAME);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            break;
        }
    }

    Err(AriaError::NotInitialized)
}

/// Load project config (.aria-at/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(workspace_dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&workspace_dir.join("config.yaml"))
}

/// Load user config (~/.config/aria-at/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("aria-at")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Load configuration with the full precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(workspace_dir: &Path, cli: &CliOverrides) -> Result<ConfigLayer> {
    let user = load_user_config()?;
    let project = load_project_config(workspace_dir)?;
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    Ok(ConfigLayer::merge_layers(&[user, project, env_layer, cli_layer]))
}

/// Resolve settings for a workspace.
///
/// # Errors
///
/// Returns an error if config cannot be loaded or a value is invalid.
pub fn load_settings(workspace_dir: &Path, cli: &CliOverrides) -> Result<Settings> {
    let layer = load_config(workspace_dir, cli)?;
    Settings::from_layer(&layer, workspace_dir)
}

/// Open storage using resolved settings.
///
/// # Errors
///
/// Returns `AriaError::DatabaseNotFound` if the database file is missing, or
/// an error if it cannot be opened.
pub fn open_storage(settings: &Settings) -> Result<SqliteStorage> {
    if !settings.db_path.exists() {
        return Err(AriaError::DatabaseNotFound {
            path: settings.db_path.clone(),
        });
    }
    SqliteStorage::open_with_timeout(&settings.db_path, Some(settings.lock_timeout_ms))
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        layer.set(&key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
