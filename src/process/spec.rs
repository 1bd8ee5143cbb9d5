//! # Process declarations.
//!
//! A [`ProcessSpec`] names one long-running process: its unique name, the
//! registered component implementing it (`class`), a parameter table and an
//! optional entry point. Specs are read from `[[application.process]]` tables:
//!
//! ```toml
//! [[application.process]]
//! name = "jobs"
//! class = "Scheduler"
//! execute = "execute"           # optional
//!
//! [application.process.params]
//! processor = [{ task = "Cleanup", every_ms = 60000 }]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entry point invoked when a spec does not name one.
pub const DEFAULT_ENTRY_POINT: &str = "execute";

/// Declaration of one long-running process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpec {
    name: String,
    class: String,
    #[serde(default)]
    params: BTreeMap<String, Value>,
    #[serde(default, rename = "execute", skip_serializing_if = "Option::is_none")]
    entry_point: Option<String>,
}

impl ProcessSpec {
    /// Creates a spec with no parameters and the default entry point.
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            params: BTreeMap::new(),
            entry_point: None,
        }
    }

    /// Adds one parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Overrides the entry point.
    pub fn with_entry_point(mut self, entry: impl Into<String>) -> Self {
        self.entry_point = Some(entry.into());
        self
    }

    /// Unique process name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the registered component implementing the process.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Raw parameter table.
    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// Entry point to invoke; [`DEFAULT_ENTRY_POINT`] unless overridden.
    pub fn entry_point(&self) -> &str {
        self.entry_point.as_deref().unwrap_or(DEFAULT_ENTRY_POINT)
    }
}
