//! # Supervisor runtime configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for the supervisor.
//! It is read from the `supervisor` section of the application configuration
//! (see [`SupervisorConfig::from_store`]) or built in code.
//!
//! ## Sentinel values
//! - `grace_ms = 0` → wait for processes without a bound (no forced termination)
//! - `bus_capacity = 0` → clamped to 1 by the bus

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::config::ConfigStore;
use crate::error::ConfigError;

/// Default relative path of the pid file.
pub const DEFAULT_PID_FILE: &str = "pid";

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `grace`: Maximum wait for processes to return after cancellation (`0s` = unbounded)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `pid_file`: Where the process id is persisted while running
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time to wait for processes to return once shutdown begins.
    ///
    /// When a shutdown signal is received:
    /// - The shared token is cancelled
    /// - Supervisor waits up to `grace` for entry points to return
    /// - If the wait expires, stragglers are aborted and `RuntimeError::GraceExceeded` is returned
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Pid file written at startup and removed at shutdown.
    pub pid_file: PathBuf,
}

/// On-disk shape of the `supervisor` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawSupervisorConfig {
    grace_ms: Option<u64>,
    bus_capacity: Option<usize>,
    pid_file: Option<PathBuf>,
}

impl SupervisorConfig {
    /// Reads the `supervisor` section, falling back to defaults for absent keys.
    pub fn from_store(store: &ConfigStore) -> Result<Self, ConfigError> {
        let raw: RawSupervisorConfig = store.section("supervisor")?.unwrap_or_default();
        let def = Self::default();
        Ok(Self {
            grace: raw.grace_ms.map(Duration::from_millis).unwrap_or(def.grace),
            bus_capacity: raw.bus_capacity.unwrap_or(def.bus_capacity),
            pid_file: raw.pid_file.unwrap_or(def.pid_file),
        })
    }

    /// Returns the shutdown bound as an `Option`.
    ///
    /// - `None` → wait until every process returned
    /// - `Some(d)` → abort stragglers after `d`
    #[inline]
    pub fn grace_limit(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `grace = 60s` (reasonable graceful shutdown window)
    /// - `bus_capacity = 1024` (good baseline)
    /// - `pid_file = "pid"` (relative to the working directory)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
            pid_file: PathBuf::from(DEFAULT_PID_FILE),
        }
    }
}
