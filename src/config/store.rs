//! # Read-only configuration store.
//!
//! [`ConfigStore`] holds the whole configuration as one value tree and answers
//! dotted-key lookups (`app.retries`). It is filled completely before the
//! container exists and shared as `Arc<ConfigStore>` afterwards, so concurrent
//! reads need no locking.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::scalar::{Scalar, describe};
use crate::error::ConfigError;

/// Configuration values addressed by dotted keys.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    root: Map<String, Value>,
}

impl ConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from a value tree; non-table roots yield an empty store.
    ///
    /// ## Example
    /// ```rust
    /// use bootvisor::ConfigStore;
    /// use serde_json::json;
    ///
    /// let store = ConfigStore::from_value(json!({ "app": { "retries": 3 } }));
    /// assert_eq!(store.get("app.retries"), Some(&json!(3)));
    /// assert!(store.get("app.missing").is_none());
    /// ```
    pub fn from_value(root: Value) -> Self {
        match root {
            Value::Object(map) => Self { root: map },
            _ => Self::default(),
        }
    }

    /// Parses a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        let root: Value = toml::from_str(source)?;
        Ok(Self::from_value(root))
    }

    /// Looks up a dotted key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let first = parts.next()?;
        let mut current = self.root.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Returns `true` if the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Reads a scalar; `Ok(None)` if the key is absent.
    pub fn scalar<S: Scalar>(&self, key: &str) -> Result<Option<S>, ConfigError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        S::from_value(value)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidSection {
                key: key.to_string(),
                reason: format!("expected {}, found {}", S::KIND, describe(value)),
            })
    }

    /// Decodes a whole section; `Ok(None)` if the key is absent.
    pub fn section<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        T::deserialize(value)
            .map(Some)
            .map_err(|e| ConfigError::InvalidSection {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    /// Mounts a value tree under a top-level name, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.root.insert(name.into(), value);
    }
}
