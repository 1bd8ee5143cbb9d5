//! # Long-running processes.
//!
//! A [`Process`] is a [`Component`] the supervisor can launch. Launching one
//! instance follows a fixed order:
//!
//! ```text
//! container assembly (default → app → construct → fields → init)
//!   └─► Process::bind(ProcessContext)      fixed fields: name, token, container
//!         └─► Process::params table        parameters from the ProcessSpec
//!               └─► Process::call(entry)   runs until the shared token is cancelled
//! ```
//!
//! The entry point must return once [`ProcessContext::cancelled`] resolves,
//! after draining whatever work it has in flight. Its error is only logged.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::params::Params;
use super::spec::{DEFAULT_ENTRY_POINT, ProcessSpec};
use crate::error::{ConfigError, ProcessError, ResolveError};
use crate::ioc::{Component, Container, Session, Wiring, assemble};

/// A component with an async entry point, launched by the supervisor.
#[async_trait]
pub trait Process: Component {
    /// Parameters accepted from the process spec.
    fn params(params: Params<Self>) -> Params<Self> {
        params
    }

    /// Receives the name, shared token and container handle before parameters
    /// are applied.
    fn bind(&mut self, ctx: ProcessContext);

    /// Entry point names accepted by [`call`](Process::call).
    fn entry_points() -> &'static [&'static str] {
        &[DEFAULT_ENTRY_POINT]
    }

    /// Dispatches an entry point by name.
    async fn call(&self, entry: &str) -> Result<(), ProcessError> {
        match entry {
            DEFAULT_ENTRY_POINT => self.execute().await,
            other => Err(ProcessError::UnknownEntryPoint {
                entry: other.to_string(),
            }),
        }
    }

    /// Default entry point.
    async fn execute(&self) -> Result<(), ProcessError>;
}

/// The fixed fields handed to every launched process.
#[derive(Clone, Default)]
pub struct ProcessContext {
    name: String,
    token: CancellationToken,
    container: Option<Arc<Container>>,
}

impl ProcessContext {
    /// Builds a context for process `name`, observing `token`.
    pub fn new(
        name: impl Into<String>,
        token: CancellationToken,
        container: Option<Arc<Container>>,
    ) -> Self {
        Self {
            name: name.into(),
            token,
            container,
        }
    }

    /// Process name from the spec.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Container handle.
    pub fn container(&self) -> Option<&Arc<Container>> {
        self.container.as_ref()
    }

    /// Resolves when shutdown was requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Returns `true` once shutdown was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A fully prepared entry point invocation.
pub(crate) type ProcessRun = BoxFuture<'static, Result<(), ProcessError>>;

/// Type-erased launch hooks of one process kind.
pub(crate) struct Launcher {
    validate: fn(&ProcessSpec) -> Result<(), ConfigError>,
    prepare: fn(&mut Session<'_>, &str, &ProcessSpec, ProcessContext) -> Result<ProcessRun, ResolveError>,
}

impl Launcher {
    pub(crate) fn of<T: Process>() -> Self {
        Self {
            validate: validate::<T>,
            prepare: prepare::<T>,
        }
    }

    /// Checks the entry point and parameter table of a spec.
    pub(crate) fn validate(&self, spec: &ProcessSpec) -> Result<(), ConfigError> {
        (self.validate)(spec)
    }

    /// Assembles a fresh instance and returns its entry point future.
    pub(crate) fn prepare(
        &self,
        session: &mut Session<'_>,
        component: &str,
        spec: &ProcessSpec,
        ctx: ProcessContext,
    ) -> Result<ProcessRun, ResolveError> {
        (self.prepare)(session, component, spec, ctx)
    }
}

fn validate<T: Process>(spec: &ProcessSpec) -> Result<(), ConfigError> {
    if !T::entry_points().contains(&spec.entry_point()) {
        return Err(ConfigError::UnknownEntryPoint {
            process: spec.name().to_string(),
            entry: spec.entry_point().to_string(),
        });
    }
    T::params(Params::new()).validate(spec)
}

fn prepare<T: Process>(
    session: &mut Session<'_>,
    component: &str,
    spec: &ProcessSpec,
    ctx: ProcessContext,
) -> Result<ProcessRun, ResolveError> {
    let wiring = T::wiring(Wiring::new());
    session.enter(component)?;
    let assembled = assemble::<T>(&wiring, session, component);
    session.leave();

    let mut process = assembled?;
    process.bind(ctx);
    T::params(Params::new()).apply(&mut process, spec)?;

    let process = Arc::new(process);
    let entry = spec.entry_point().to_string();
    Ok(Box::pin(async move { process.call(&entry).await }))
}
