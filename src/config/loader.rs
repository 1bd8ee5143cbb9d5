//! # Configuration loading from disk.
//!
//! The application configuration is one TOML file whose path may contain the
//! `{env}` placeholder, replaced by the environment selected on the command line
//! (`-e prod` turns `config/app.{env}.toml` into `config/app.prod.toml`).
//!
//! ## Imports
//! `application.import` lists more files (same placeholder rules). Each one is
//! mounted under the first dot-separated segment of its file name:
//!
//! ```text
//! [application]
//! import = ["config/db.{env}.toml"]     # mounted as `db`, so `db.host` resolves
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use super::store::ConfigStore;
use crate::error::ConfigError;
use crate::process::ProcessSpec;

/// Placeholder replaced by the selected environment.
pub const ENV_PLACEHOLDER: &str = "{env}";

/// Environment used when none is selected.
pub const DEFAULT_ENV: &str = "dev";

/// Resolves a path template for an environment.
pub fn config_path(template: &str, env: &str) -> PathBuf {
    PathBuf::from(template.replace(ENV_PLACEHOLDER, env))
}

/// Loads the main configuration file and its imports.
pub fn load(template: &str, env: &str) -> Result<ConfigStore, ConfigError> {
    let path = config_path(template, env);
    let mut store = ConfigStore::from_value(read_toml(&path)?);

    let imports: Vec<String> = store.section("application.import")?.unwrap_or_default();
    for import in imports {
        let path = config_path(&import, env);
        let value = read_toml(&path)?;
        store.insert(mount_name(&path), value);
        tracing::debug!(path = %path.display(), "configuration imported");
    }
    Ok(store)
}

fn read_toml(path: &Path) -> Result<Value, ConfigError> {
    let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&source).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn mount_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or_default()
        .to_string()
}

/// The `application` section: declared processes and imports.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    /// Display name of the application.
    pub name: Option<String>,
    /// Additional configuration files.
    pub import: Vec<String>,
    /// Long-running processes to supervise.
    pub process: Vec<ProcessSpec>,
}

impl ApplicationSettings {
    /// Reads the `application` section; absent means no processes.
    pub fn from_store(store: &ConfigStore) -> Result<Self, ConfigError> {
        Ok(store.section("application")?.unwrap_or_default())
    }
}

/// The `log` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LogSettings {
    /// Reads the `log` section.
    pub fn from_store(store: &ConfigStore) -> Result<Self, ConfigError> {
        Ok(store.section("log")?.unwrap_or_default())
    }
}
