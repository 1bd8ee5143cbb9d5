//! # Example: Heartbeat
//!
//! Wires a shared counter into a long-running heartbeat process and a
//! scheduled job, then runs until Ctrl-C (or `heartbeat -stop` from another
//! terminal).
//!
//! ```text
//! cargo run --example heartbeat -- -e dev
//! cargo run --example heartbeat -- -stop
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bootvisor::{
    App, Component, Declaration, Event, EventKind, Job, Params, Process, ProcessContext,
    ProcessError, Subscribe, Wiring,
};

/// Shared counter, one instance per application.
#[derive(Default)]
struct Beats {
    count: AtomicU64,
}

impl Component for Beats {}

/// Prints a beat every `interval_ms` until shutdown.
#[derive(Default)]
struct Heartbeat {
    ctx: ProcessContext,
    beats: Option<Arc<Beats>>,
    label: String,
    interval: Duration,
}

impl Component for Heartbeat {
    fn wiring(w: Wiring<Self>) -> Wiring<Self> {
        w.reference::<Beats>("beats", |h, b| h.beats = Some(b))
            .value("label", "heartbeat.label", |h: &mut Heartbeat, v: String| h.label = v)
    }

    fn construct(&mut self) -> Result<(), bootvisor::HookError> {
        self.label = "beat".to_string();
        self.interval = Duration::from_secs(1);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Process for Heartbeat {
    fn params(params: Params<Self>) -> Params<Self> {
        params.field("interval_ms", |h: &mut Heartbeat, ms: u64| {
            h.interval = Duration::from_millis(ms.max(1))
        })
    }

    fn bind(&mut self, ctx: ProcessContext) {
        self.ctx = ctx;
    }

    async fn execute(&self) -> Result<(), ProcessError> {
        let beats = self
            .beats
            .as_ref()
            .ok_or_else(|| ProcessError::fail("beats not injected"))?;
        loop {
            tokio::select! {
                _ = self.ctx.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {
                    let n = beats.count.fetch_add(1, Ordering::Relaxed) + 1;
                    println!("[{}] {} #{n}", self.ctx.name(), self.label);
                }
            }
        }
        println!("[{}] stopping after {} beats", self.ctx.name(), beats.count.load(Ordering::Relaxed));
        Ok(())
    }
}

/// Scheduled job reporting the counter.
#[derive(Default)]
struct Report {
    beats: Option<Arc<Beats>>,
}

impl Component for Report {
    fn wiring(w: Wiring<Self>) -> Wiring<Self> {
        w.reference::<Beats>("beats", |r, b| r.beats = Some(b))
    }
}

#[async_trait::async_trait]
impl Job for Report {
    async fn run(&self, _ctx: &ProcessContext) -> Result<(), ProcessError> {
        let total = self.beats.as_ref().map_or(0, |b| b.count.load(Ordering::Relaxed));
        println!("[report] {total} beats so far");
        Ok(())
    }
}

/// Prints shutdown milestones.
struct Milestones;

#[async_trait::async_trait]
impl Subscribe for Milestones {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::ShutdownRequested => println!("[milestones] shutdown requested"),
            EventKind::AllStoppedWithin => println!("[milestones] all processes stopped"),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "milestones"
    }
}

fn main() -> ExitCode {
    App::new("demos/config/heartbeat.{env}.toml")
        .register(Declaration::component::<Beats>())
        .register(Declaration::process::<Heartbeat>())
        .register(Declaration::provide::<Report, dyn Job>(|r| r).named("Report"))
        .subscriber(Arc::new(Milestones))
        .run()
}
