//! Error types used by the bootvisor runtime, the container and processes.
//!
//! This module defines the error enums of the three phases of an application run:
//!
//! - [`ConfigError`] — configuration defects; fatal before any process is launched.
//! - [`ResolveError`] — a component could not be resolved; degrades one process only.
//! - [`ProcessError`] — failure inside a process entry point; logged, never propagated.
//! - [`RuntimeError`] — errors raised by the supervisor itself.
//!
//! All enums provide `as_label` (stable snake_case label for logs) in the same way.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::config::ScalarKind;

/// Exit status used when startup aborts on a configuration error (`EX_CONFIG`).
pub const EXIT_CONFIG: u8 = 78;

/// Exit status used for any other unclean shutdown.
pub const EXIT_FAILURE: u8 = 1;

/// # Configuration errors.
///
/// Raised while normalizing declarations, validating process specs or coercing
/// configured scalars. These abort the application before anything runs.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A raw declaration carries no implementation type.
    #[error("declaration #{index} ({}) has no implementation", .name.as_deref().unwrap_or("unnamed"))]
    MissingImplementation {
        /// Position of the declaration in the submitted list.
        index: usize,
        /// Explicit name, if one was given.
        name: Option<String>,
    },

    /// Two declarations normalize to the same component name.
    #[error("component `{name}` is registered twice")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },

    /// The declared dependency graph contains a cycle.
    #[error("dependency cycle: {}", .path.join(" -> "))]
    Cycle {
        /// Component names along the cycle; the first name is repeated at the end.
        path: Vec<String>,
    },

    /// A configured value does not match the scalar type of the field it is bound to.
    #[error("cannot inject `{component}.{field}` from `{key}`: expected {expected}, found {found}")]
    ScalarMismatch {
        /// Component owning the field.
        component: String,
        /// Field identifier.
        field: &'static str,
        /// Dotted configuration key.
        key: String,
        /// Scalar type declared by the field.
        expected: ScalarKind,
        /// Kind of the configured value.
        found: &'static str,
    },

    /// Two process specs share a name.
    #[error("process `{name}` is declared twice")]
    DuplicateProcess {
        /// The duplicated process name.
        name: String,
    },

    /// A process spec does not reference any implementation.
    #[error("process `{process}` has no class")]
    EmptyClass {
        /// Process name.
        process: String,
    },

    /// A process spec references a component that cannot be launched.
    #[error("process `{process}`: component `{class}` is not a process")]
    NotAProcess {
        /// Process name.
        process: String,
        /// Referenced component name.
        class: String,
    },

    /// A process spec names an entry point its implementation does not expose.
    #[error("process `{process}` has no entry point `{entry}`")]
    UnknownEntryPoint {
        /// Process name.
        process: String,
        /// Requested entry point.
        entry: String,
    },

    /// A process parameter is not declared by the process kind.
    #[error("process `{process}` does not accept parameter `{param}`")]
    UnknownParam {
        /// Process name.
        process: String,
        /// Parameter name.
        param: String,
    },

    /// A required process parameter is absent.
    #[error("process `{process}` requires parameter `{param}`")]
    MissingParam {
        /// Process name.
        process: String,
        /// Parameter name.
        param: &'static str,
    },

    /// A process parameter has the wrong shape.
    #[error("process `{process}` parameter `{param}`: {reason}")]
    InvalidParam {
        /// Process name.
        process: String,
        /// Parameter name.
        param: &'static str,
        /// Deserializer message.
        reason: String,
    },

    /// A configuration section could not be decoded.
    #[error("invalid configuration at `{key}`: {reason}")]
    InvalidSection {
        /// Dotted key of the section.
        key: String,
        /// Deserializer message.
        reason: String,
    },

    /// A configuration file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("cannot parse {}: {reason}", .path.display())]
    Parse {
        /// File path.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MissingImplementation { .. } => "config_missing_implementation",
            ConfigError::DuplicateName { .. } => "config_duplicate_name",
            ConfigError::Cycle { .. } => "config_cycle",
            ConfigError::ScalarMismatch { .. } => "config_scalar_mismatch",
            ConfigError::DuplicateProcess { .. } => "config_duplicate_process",
            ConfigError::EmptyClass { .. } => "config_empty_class",
            ConfigError::NotAProcess { .. } => "config_not_a_process",
            ConfigError::UnknownEntryPoint { .. } => "config_unknown_entry_point",
            ConfigError::UnknownParam { .. } => "config_unknown_param",
            ConfigError::MissingParam { .. } => "config_missing_param",
            ConfigError::InvalidParam { .. } => "config_invalid_param",
            ConfigError::InvalidSection { .. } => "config_invalid_section",
            ConfigError::Io { .. } => "config_io",
            ConfigError::Parse { .. } => "config_parse",
        }
    }
}

/// Failure reported by a `construct` or `init` hook.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Creates a hook error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Which lifecycle hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// Runs before any field injection.
    Construct,
    /// Runs after all field injection.
    Init,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Construct => f.write_str("construct"),
            Hook::Init => f.write_str("init"),
        }
    }
}

/// # Resolution errors.
///
/// A requested component could not be produced. When raised while launching a
/// process, only that process is skipped.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Nothing is registered under the requested name or capability.
    #[error("component `{reference}` is not registered")]
    NotRegistered {
        /// Requested name or capability type.
        reference: String,
    },

    /// A resolved instance does not expose the type the caller asked for.
    #[error("component `{component}`: expected {expected}, registered as {found}")]
    TypeMismatch {
        /// Component (or field owner) being resolved.
        component: String,
        /// Requested type.
        expected: &'static str,
        /// Registered capability type.
        found: &'static str,
    },

    /// A lifecycle hook reported a failure.
    #[error("component `{component}`: {hook} hook failed: {source}")]
    Hook {
        /// Component being built.
        component: String,
        /// Failed hook.
        hook: Hook,
        /// Hook failure.
        #[source]
        source: HookError,
    },

    /// Resolution hit a configuration defect.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ResolveError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResolveError::NotRegistered { .. } => "resolve_not_registered",
            ResolveError::TypeMismatch { .. } => "resolve_type_mismatch",
            ResolveError::Hook { .. } => "resolve_hook_failed",
            ResolveError::Config(e) => e.as_label(),
        }
    }

    pub(crate) fn not_registered(reference: impl Into<String>) -> Self {
        ResolveError::NotRegistered {
            reference: reference.into(),
        }
    }
}

/// # Errors produced by process entry points.
///
/// The supervisor observes only that an entry point returned; these are logged
/// with the process name and otherwise ignored.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The requested entry point is not implemented.
    #[error("no entry point `{entry}`")]
    UnknownEntryPoint {
        /// Requested entry point.
        entry: String,
    },

    /// The process observed cancellation before finishing its work.
    #[error("context cancelled")]
    Canceled,
}

impl ProcessError {
    /// Shorthand for [`ProcessError::Fail`].
    pub fn fail(error: impl fmt::Display) -> Self {
        ProcessError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use bootvisor::ProcessError;
    ///
    /// let err = ProcessError::fail("connection refused");
    /// assert_eq!(err.as_label(), "process_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::Fail { .. } => "process_failed",
            ProcessError::UnknownEntryPoint { .. } => "process_unknown_entry_point",
            ProcessError::Canceled => "process_canceled",
        }
    }
}

/// # Errors produced by the bootvisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Startup aborted on a configuration error; no process was launched.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Shutdown grace period was exceeded; stuck processes were aborted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Processes that did not return in time.
        stuck: Vec<String>,
    },

    /// The pid file could not be written, read or removed.
    #[error("pid file {}: {source}", .path.display())]
    PidFile {
        /// Pid file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The stop command could not deliver its signal.
    #[error("stop failed: {reason}")]
    Stop {
        /// What went wrong.
        reason: String,
    },

    /// The async runtime could not be created.
    #[error("runtime: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use bootvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Config(e) => e.as_label(),
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::PidFile { .. } => "runtime_pid_file",
            RuntimeError::Stop { .. } => "runtime_stop",
            RuntimeError::Io(_) => "runtime_io",
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            RuntimeError::Config(_) => EXIT_CONFIG,
            _ => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = ConfigError::Cycle {
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle: A -> B -> A");
    }

    #[test]
    fn test_config_errors_exit_with_distinct_code() {
        let cfg = RuntimeError::from(ConfigError::EmptyClass {
            process: "http".into(),
        });
        assert_eq!(cfg.exit_code(), EXIT_CONFIG);

        let grace = RuntimeError::GraceExceeded {
            grace: Duration::from_secs(1),
            stuck: vec!["http".into()],
        };
        assert_eq!(grace.exit_code(), EXIT_FAILURE);
        assert_ne!(EXIT_CONFIG, EXIT_FAILURE);
    }

    #[test]
    fn test_resolve_label_follows_wrapped_config_error() {
        let err = ResolveError::from(ConfigError::Cycle { path: vec![] });
        assert_eq!(err.as_label(), "config_cycle");
    }
}
