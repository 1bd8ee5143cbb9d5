//! # Built-in interval scheduler.
//!
//! [`Scheduler`] is registered under the name `Scheduler` in every registry built
//! with [`Registry::with_builtins`](crate::Registry::with_builtins). It runs named
//! [`Job`] components at fixed intervals:
//!
//! ```toml
//! [[application.process]]
//! name = "jobs"
//! class = "Scheduler"
//!
//! [application.process.params]
//! processor = [
//!     { task = "Cleanup", every_ms = 60000 },
//!     { task = "Report",  every_ms = 5000 },
//! ]
//! ```
//!
//! Each `task` is resolved by component name as `dyn Job`; a task that cannot be
//! resolved is logged and skipped. On cancellation every job finishes its current
//! run and the scheduler returns.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use super::params::Params;
use super::process::{Process, ProcessContext};
use crate::error::ProcessError;
use crate::ioc::Component;

/// A unit of periodic work, registered as `dyn Job`.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Runs once. `ctx` is the scheduler's process context.
    async fn run(&self, ctx: &ProcessContext) -> Result<(), ProcessError>;
}

/// One `processor` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduledJob {
    /// Component name of the job.
    pub task: String,
    /// Interval between runs, in milliseconds.
    pub every_ms: NonZeroU64,
}

/// Runs [`Job`]s on fixed intervals until shutdown.
#[derive(Default)]
pub struct Scheduler {
    ctx: ProcessContext,
    processor: Vec<ScheduledJob>,
}

impl Scheduler {
    /// Configured jobs.
    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.processor
    }
}

impl Component for Scheduler {}

#[async_trait]
impl Process for Scheduler {
    fn params(params: Params<Self>) -> Params<Self> {
        params.required("processor", |s: &mut Scheduler, jobs: Vec<ScheduledJob>| {
            s.processor = jobs
        })
    }

    fn bind(&mut self, ctx: ProcessContext) {
        self.ctx = ctx;
    }

    async fn execute(&self) -> Result<(), ProcessError> {
        let container = self
            .ctx
            .container()
            .cloned()
            .ok_or_else(|| ProcessError::fail("scheduler launched without a container"))?;

        let mut running = JoinSet::new();
        for scheduled in &self.processor {
            let c = Arc::clone(&container);
            let task = scheduled.task.clone();
            let resolved = tokio::task::spawn_blocking(move || c.get::<dyn Job>(&task)).await;
            let job = match resolved {
                Ok(Ok(job)) => job,
                Ok(Err(e)) => {
                    tracing::warn!(
                        process = self.ctx.name(),
                        task = %scheduled.task,
                        error = %e,
                        label = e.as_label(),
                        "job skipped"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!(process = self.ctx.name(), task = %scheduled.task, error = %e, "job skipped");
                    continue;
                }
            };
            let every = Duration::from_millis(scheduled.every_ms.get());
            running.spawn(tick(job, scheduled.task.clone(), every, self.ctx.clone()));
        }

        if running.is_empty() {
            tracing::warn!(process = self.ctx.name(), "no runnable jobs");
        }
        while running.join_next().await.is_some() {}
        Ok(())
    }
}

async fn tick(job: Arc<dyn Job>, task: String, every: Duration, ctx: ProcessContext) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => break,
            _ = interval.tick() => {}
        }
        if let Err(e) = job.run(&ctx).await {
            tracing::warn!(process = ctx.name(), task = %task, error = %e, "job failed");
        }
    }
    tracing::debug!(process = ctx.name(), task = %task, "job stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use crate::config::ConfigStore;
    use crate::ioc::{Container, Declaration, Registry};
    use crate::process::ProcessSpec;

    static RUNS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct Counter;
    impl Component for Counter {}

    #[async_trait]
    impl Job for Counter {
        async fn run(&self, _ctx: &ProcessContext) -> Result<(), ProcessError> {
            RUNS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_runs_jobs_until_cancelled() {
        let registry = Registry::with_builtins(vec![
            Declaration::provide::<Counter, dyn Job>(|c| c).named("Counter"),
        ])
        .unwrap();
        let container = Container::new(registry, Arc::new(ConfigStore::new()));

        let spec = ProcessSpec::new("jobs", "Scheduler").with_param(
            "processor",
            json!([
                { "task": "Counter", "every_ms": 10 },
                { "task": "Missing", "every_ms": 10 }
            ]),
        );
        let token = CancellationToken::new();
        let ctx = ProcessContext::new("jobs", token.clone(), Some(Arc::clone(&container)));
        let run = container.launch(&spec, ctx).unwrap();

        let handle = tokio::spawn(run);
        tokio::time::sleep(Duration::from_millis(60)).await;
        token.cancel();
        handle.await.unwrap().unwrap();
        assert!(RUNS.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_processor_is_required() {
        let spec = ProcessSpec::new("jobs", "Scheduler");
        let err = Scheduler::params(Params::new()).validate(&spec).unwrap_err();
        assert_eq!(err.as_label(), "config_missing_param");

        let zero = ProcessSpec::new("jobs", "Scheduler")
            .with_param("processor", json!([{ "task": "x", "every_ms": 0 }]));
        assert!(Scheduler::params(Params::new()).validate(&zero).is_err());
    }
}
