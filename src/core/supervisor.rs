//! # Supervisor: launches every configured process and drives one clean shutdown.
//!
//! The [`Supervisor`] owns the event bus, the subscriber fan-out and the state
//! machine of an application run:
//!
//! ```text
//! Init ──► Starting ──► Running ──► Stopping ──► Stopped
//!  │          │            │           │            │
//!  │          │            │           │            └─ AllStopped published, subscribers
//!  │          │            │           │               drained, pid file removed
//!  │          │            │           └─ cancellation observed (or every process
//!  │          │            │              returned); bounded wait of `grace`
//!  │          │            └─ one task per ProcessSpec, blocked on the JoinSet
//!  │          └─ pid file, subscriber listener, signal listener, canceller,
//!  │             shared token derived from the root token
//!  └─ pre-flight: configuration bindings and process specs (ConfigError → abort)
//! ```
//!
//! ## Shutdown path
//! ```text
//! signal future ──► listener task ──oneshot──► canceller task
//!                                                 ├─► Bus.publish(ShutdownRequested)
//!                                                 └─► root.cancel() ─► shared token
//!                                                                        │
//!                             every ProcessContext::cancelled() resolves ◄┘
//! ```
//!
//! The oneshot fires at most once, so the shared token is cancelled at most once
//! no matter how many signals arrive.
//!
//! ## Process task
//! ```text
//! spawn_blocking(container.launch(spec))      assemble, bind, params
//!   ├─ Err  → ProcessSkipped (the other processes continue)
//!   └─ Ok   → ProcessStarting → entry point
//!               ├─ Ok      → ProcessStopped
//!               └─ Err/panic → ProcessFailed
//! ```
//! A process that returns is done; nothing is restarted.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use super::alive::AliveTracker;
use super::builder::SupervisorBuilder;
use super::config::SupervisorConfig;
use super::{pidfile, shutdown};
use crate::error::{ConfigError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::ioc::Container;
use crate::process::{ProcessContext, ProcessSpec};
use crate::subscribers::{Subscribe, SubscriberSet, panic_message};

/// Lifecycle state of an application run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Validating configuration; nothing launched yet.
    Init,
    /// Installing the pid file, listeners and the shared token.
    Starting,
    /// Every process launched; waiting for them to return.
    Running,
    /// Shutdown in progress.
    Stopping,
    /// Every process returned (or was aborted).
    Stopped,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Init => "INIT",
            State::Starting => "STARTING",
            State::Running => "RUNNING",
            State::Stopping => "STOPPING",
            State::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}

/// Launches processes from their specs and coordinates graceful shutdown.
pub struct Supervisor {
    cfg: SupervisorConfig,
    container: Arc<Container>,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
    state: watch::Sender<State>,
}

impl Supervisor {
    /// Starts building a supervisor over `container`.
    pub fn builder(container: Arc<Container>) -> SupervisorBuilder {
        SupervisorBuilder::new(container)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        container: Arc<Container>,
        bus: Bus,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let (state, _) = watch::channel(State::Init);
        Self {
            cfg,
            container,
            bus,
            subscribers,
            state,
        }
    }

    /// Runtime configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// The event bus; subscribe before [`run`](Self::run) to observe a whole run.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Watches state transitions.
    pub fn state(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Runs `specs` until a termination signal (SIGINT/SIGTERM/SIGQUIT) or until
    /// every process returned on its own.
    pub async fn run(&self, specs: Vec<ProcessSpec>) -> Result<(), RuntimeError> {
        self.run_until(specs, shutdown::os_signal()).await
    }

    /// Like [`run`](Self::run), with `signal` standing in for the OS signals.
    pub async fn run_until<F>(&self, specs: Vec<ProcessSpec>, signal: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.transition(State::Init);
        if let Err(e) = self.preflight(&specs) {
            tracing::error!(error = %e, label = e.as_label(), "configuration rejected");
            self.transition(State::Stopped);
            return Err(e.into());
        }

        self.transition(State::Starting);
        if let Err(e) = pidfile::write(&self.cfg.pid_file) {
            self.transition(State::Stopped);
            return Err(e);
        }

        let alive = Arc::new(AliveTracker::new());
        let listener_done = CancellationToken::new();
        let subs = SubscriberSet::new(self.subscribers.clone(), self.bus.clone());
        let listener = self.subscriber_listener(subs, Arc::clone(&alive), listener_done.clone());

        let root = CancellationToken::new();
        let shared = root.child_token();
        let (signal_task, stop_rx) = shutdown::signal_listener(signal);
        let canceller = self.canceller(stop_rx, root);

        self.transition(State::Running);
        let mut set = JoinSet::new();
        for spec in specs {
            set.spawn(launch(
                Arc::clone(&self.container),
                spec,
                shared.clone(),
                self.bus.clone(),
            ));
        }

        let cancelled = tokio::select! {
            _ = shared.cancelled() => true,
            _ = drain(&mut set) => false,
        };
        self.transition(State::Stopping);
        let result = if cancelled {
            self.wait_all_with_grace(&mut set, &alive).await
        } else {
            tracing::info!("every process returned on its own");
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        };

        signal_task.abort();
        canceller.abort();
        listener_done.cancel();
        match listener.await {
            Ok(subs) => subs.shutdown().await,
            Err(e) => tracing::warn!(error = %e, "subscriber listener failed"),
        }

        let removed = pidfile::remove(&self.cfg.pid_file);
        self.transition(State::Stopped);
        result.and(removed)
    }

    /// Rejects configuration defects before anything is launched.
    fn preflight(&self, specs: &[ProcessSpec]) -> Result<(), ConfigError> {
        self.container.check_config()?;

        let registry = self.container.registry();
        let mut names = HashSet::new();
        for spec in specs {
            if !names.insert(spec.name()) {
                return Err(ConfigError::DuplicateProcess {
                    name: spec.name().to_string(),
                });
            }
            if spec.class().trim().is_empty() {
                return Err(ConfigError::EmptyClass {
                    process: spec.name().to_string(),
                });
            }
            // Unregistered classes are resolution errors, reported at launch.
            let Some(descriptor) = registry.by_name(spec.class()) else {
                continue;
            };
            let launcher = descriptor.launcher().ok_or_else(|| ConfigError::NotAProcess {
                process: spec.name().to_string(),
                class: spec.class().to_string(),
            })?;
            launcher.validate(spec)?;
        }
        Ok(())
    }

    /// Forwards bus events to the alive tracker and the subscriber set.
    ///
    /// After `done` fires, already published events are still delivered; the set
    /// is handed back for draining.
    fn subscriber_listener(
        &self,
        set: SubscriberSet,
        alive: Arc<AliveTracker>,
        done: CancellationToken,
    ) -> JoinHandle<SubscriberSet> {
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    biased;
                    r = rx.recv() => r,
                    _ = done.cancelled() => break,
                };
                match received {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        set.emit(&ev);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        set.emit(&ev);
                    }
                    Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            set
        })
    }

    /// Awaits the one-shot stop notification and cancels the root token.
    fn canceller(&self, stop: oneshot::Receiver<()>, root: CancellationToken) -> JoinHandle<()> {
        let bus = self.bus.clone();
        tokio::spawn(async move {
            if stop.await.is_ok() {
                bus.publish(Event::new(EventKind::ShutdownRequested));
                root.cancel();
            }
        })
    }

    /// Waits for every process within the grace period; aborts the rest on expiry.
    async fn wait_all_with_grace(
        &self,
        set: &mut JoinSet<()>,
        alive: &AliveTracker,
    ) -> Result<(), RuntimeError> {
        let Some(grace) = self.cfg.grace_limit() else {
            drain(set).await;
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            return Ok(());
        };

        let within = tokio::time::timeout(grace, drain(set)).await.is_ok();
        if within {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            return Ok(());
        }

        let stuck = alive.snapshot().await;
        self.bus.publish(
            Event::new(EventKind::GraceExceeded)
                .with_grace(grace)
                .with_reason(stuck.join(", ")),
        );
        set.abort_all();
        drain(set).await;
        Err(RuntimeError::GraceExceeded { grace, stuck })
    }

    fn transition(&self, next: State) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::info!(from = %prev, to = %next, "supervisor state");
        }
    }
}

async fn drain(set: &mut JoinSet<()>) {
    while set.join_next().await.is_some() {}
}

/// Assembles one process off the async workers and runs its entry point.
async fn launch(container: Arc<Container>, spec: ProcessSpec, token: CancellationToken, bus: Bus) {
    let name = spec.name().to_string();
    let ctx = ProcessContext::new(name.clone(), token, Some(Arc::clone(&container)));

    let prepared = tokio::task::spawn_blocking(move || container.launch(&spec, ctx)).await;
    let run = match prepared {
        Ok(Ok(run)) => run,
        Ok(Err(e)) => {
            bus.publish(
                Event::new(EventKind::ProcessSkipped)
                    .with_process(name)
                    .with_reason(format!("{} ({})", e, e.as_label())),
            );
            return;
        }
        Err(e) => {
            bus.publish(
                Event::new(EventKind::ProcessSkipped)
                    .with_process(name)
                    .with_reason(format!("assembly aborted: {e}")),
            );
            return;
        }
    };

    bus.publish(Event::new(EventKind::ProcessStarting).with_process(name.as_str()));
    let outcome = std::panic::AssertUnwindSafe(run).catch_unwind().await;
    let ev = match outcome {
        Ok(Ok(())) => Event::new(EventKind::ProcessStopped),
        Ok(Err(e)) => Event::new(EventKind::ProcessFailed).with_reason(format!("{} ({})", e, e.as_label())),
        Err(panic) => Event::new(EventKind::ProcessFailed).with_reason(format!(
            "panicked: {}",
            panic_message(&*panic)
        )),
    };
    bus.publish(ev.with_process(name));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::ConfigStore;
    use crate::error::{HookError, ProcessError};
    use crate::ioc::{Component, Declaration, Registry, Wiring};
    use crate::process::{Params, Process};

    #[derive(Default)]
    struct Probe {
        started: AtomicUsize,
        observed: AtomicUsize,
        returned: AtomicUsize,
    }
    impl Component for Probe {}

    #[derive(Default)]
    struct Sleeper {
        ctx: ProcessContext,
        probe: Option<Arc<Probe>>,
    }

    impl Component for Sleeper {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.reference::<Probe>("probe", |s, p| s.probe = Some(p))
        }
    }

    #[async_trait]
    impl Process for Sleeper {
        fn bind(&mut self, ctx: ProcessContext) {
            self.ctx = ctx;
        }

        async fn execute(&self) -> Result<(), ProcessError> {
            let probe = self
                .probe
                .as_ref()
                .ok_or_else(|| ProcessError::fail("probe not injected"))?;
            probe.started.fetch_add(1, Ordering::SeqCst);
            self.ctx.cancelled().await;
            probe.observed.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            probe.returned.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Stubborn {
        probe: Option<Arc<Probe>>,
    }

    impl Component for Stubborn {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.reference::<Probe>("probe", |s, p| s.probe = Some(p))
        }
    }

    #[async_trait]
    impl Process for Stubborn {
        fn bind(&mut self, _ctx: ProcessContext) {}

        async fn execute(&self) -> Result<(), ProcessError> {
            if let Some(probe) = &self.probe {
                probe.started.fetch_add(1, Ordering::SeqCst);
            }
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Orphan {
        missing: Option<Arc<dyn Subscribe>>,
    }

    impl Component for Orphan {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.reference_named::<dyn Subscribe>("missing", "Nobody", |o, m| o.missing = Some(m))
        }
    }

    #[async_trait]
    impl Process for Orphan {
        fn bind(&mut self, _ctx: ProcessContext) {}

        async fn execute(&self) -> Result<(), ProcessError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Port {
        port: u16,
    }

    impl Component for Port {}

    #[async_trait]
    impl Process for Port {
        fn params(params: Params<Self>) -> Params<Self> {
            params.required("port", |p: &mut Port, v: u16| p.port = v)
        }

        fn bind(&mut self, _ctx: ProcessContext) {}

        async fn execute(&self) -> Result<(), ProcessError> {
            Ok(())
        }
    }

    #[derive(Default, Clone)]
    struct DbSettings {
        port: i64,
    }

    impl Component for DbSettings {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.value("port", "db.port", |d: &mut DbSettings, v: i64| d.port = v)
        }
    }

    #[derive(Default)]
    struct Repo {
        db: DbSettings,
        probe: Option<Arc<Probe>>,
    }

    impl Component for Repo {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.nested::<DbSettings>("db", |r, d| r.db = d)
                .reference::<Probe>("probe", |r, p| r.probe = Some(p))
        }
    }

    #[async_trait]
    impl Process for Repo {
        fn bind(&mut self, _ctx: ProcessContext) {}

        async fn execute(&self) -> Result<(), ProcessError> {
            if let Some(probe) = &self.probe {
                probe.started.fetch_add(1, Ordering::SeqCst);
            }
            assert!(self.db.port > 0);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(EventKind, Option<String>)>>,
    }

    impl Recorder {
        fn count(&self, kind: EventKind) -> usize {
            self.events.lock().unwrap().iter().filter(|(k, _)| *k == kind).count()
        }

        fn processes(&self, kind: EventKind) -> Vec<String> {
            let mut v: Vec<String> = self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, _)| *k == kind)
                .filter_map(|(_, p)| p.clone())
                .collect();
            v.sort();
            v
        }
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            let process = ev.process.as_deref().map(str::to_owned);
            self.events.lock().unwrap().push((ev.kind, process));
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        container: Arc<Container>,
        cfg: SupervisorConfig,
        recorder: Arc<Recorder>,
    }

    impl Harness {
        fn new(grace: Duration) -> Self {
            Self::with_store(grace, ConfigStore::new())
        }

        fn with_store(grace: Duration, store: ConfigStore) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let registry = Registry::with_builtins(vec![
                Declaration::component::<Probe>(),
                Declaration::process::<Sleeper>(),
                Declaration::process::<Stubborn>(),
                Declaration::process::<Orphan>(),
                Declaration::process::<Port>(),
                Declaration::process::<Repo>(),
            ])
            .unwrap();
            let cfg = SupervisorConfig {
                grace,
                pid_file: dir.path().join("pid"),
                ..SupervisorConfig::default()
            };
            Self {
                _dir: dir,
                container: Container::new(registry, Arc::new(store)),
                cfg,
                recorder: Arc::new(Recorder::default()),
            }
        }

        fn supervisor(&self) -> Supervisor {
            Supervisor::builder(Arc::clone(&self.container))
                .with_config(self.cfg.clone())
                .with_subscribers(vec![self.recorder.clone() as Arc<dyn Subscribe>])
                .build()
        }

        fn probe(&self) -> Arc<Probe> {
            self.container.resolve::<Probe>().unwrap()
        }
    }

    async fn wait_until(cond: impl Fn() -> bool) {
        for _ in 0..400 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_single_signal_stops_every_process() {
        let h = Harness::new(Duration::from_secs(5));
        let sup = h.supervisor();
        let states = sup.state();
        let probe = h.probe();
        let specs = vec![
            ProcessSpec::new("a", "Sleeper"),
            ProcessSpec::new("b", "Sleeper"),
            ProcessSpec::new("c", "Sleeper"),
        ];

        let (stop, stopped) = oneshot::channel::<()>();
        let run = tokio::spawn(async move {
            sup.run_until(specs, async move {
                let _ = stopped.await;
            })
            .await
        });

        wait_until(|| probe.started.load(Ordering::SeqCst) == 3).await;
        assert_eq!(*states.borrow(), State::Running);
        assert!(h.cfg.pid_file.exists());
        assert_eq!(probe.returned.load(Ordering::SeqCst), 0);

        stop.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap();

        assert!(result.is_ok());
        assert_eq!(probe.observed.load(Ordering::SeqCst), 3);
        assert_eq!(probe.returned.load(Ordering::SeqCst), 3);
        assert_eq!(h.recorder.count(EventKind::ShutdownRequested), 1);
        assert_eq!(h.recorder.count(EventKind::AllStoppedWithin), 1);
        assert_eq!(h.recorder.processes(EventKind::ProcessStopped), vec!["a", "b", "c"]);
        assert_eq!(*states.borrow(), State::Stopped);
        assert!(!h.cfg.pid_file.exists());
    }

    #[tokio::test]
    async fn test_unresolvable_process_is_skipped() {
        let h = Harness::new(Duration::from_secs(5));
        let sup = h.supervisor();
        let probe = h.probe();
        let specs = vec![
            ProcessSpec::new("first", "Sleeper"),
            ProcessSpec::new("second", "NotRegistered"),
            ProcessSpec::new("third", "Sleeper"),
            ProcessSpec::new("fourth", "Orphan"),
        ];

        let (stop, stopped) = oneshot::channel::<()>();
        let run = tokio::spawn(async move {
            sup.run_until(specs, async move {
                let _ = stopped.await;
            })
            .await
        });

        wait_until(|| probe.started.load(Ordering::SeqCst) == 2).await;
        stop.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap();

        assert!(result.is_ok());
        assert_eq!(probe.returned.load(Ordering::SeqCst), 2);
        assert_eq!(
            h.recorder.processes(EventKind::ProcessSkipped),
            vec!["fourth", "second"]
        );
        assert_eq!(
            h.recorder.processes(EventKind::ProcessStopped),
            vec!["first", "third"]
        );
    }

    #[tokio::test]
    async fn test_grace_exceeded_aborts_stragglers() {
        let h = Harness::new(Duration::from_millis(50));
        let sup = h.supervisor();
        let probe = h.probe();
        let specs = vec![
            ProcessSpec::new("polite", "Sleeper"),
            ProcessSpec::new("stubborn", "Stubborn"),
        ];

        let (stop, stopped) = oneshot::channel::<()>();
        let run = tokio::spawn(async move {
            sup.run_until(specs, async move {
                let _ = stopped.await;
            })
            .await
        });

        wait_until(|| probe.started.load(Ordering::SeqCst) == 2).await;
        stop.send(()).unwrap();
        let err = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();

        match &err {
            RuntimeError::GraceExceeded { stuck, .. } => assert_eq!(stuck, &vec!["stubborn".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
        assert_ne!(err.exit_code(), 0);
        assert_eq!(h.recorder.count(EventKind::GraceExceeded), 1);
        assert!(!h.cfg.pid_file.exists());
    }

    #[tokio::test]
    async fn test_processes_returning_on_their_own_end_the_run() {
        let h = Harness::new(Duration::from_secs(5));
        let sup = h.supervisor();
        let specs = vec![ProcessSpec::new("port", "Port").with_param("port", 8080)];

        let result = sup.run_until(specs, std::future::pending()).await;
        assert!(result.is_ok());
        assert_eq!(h.recorder.count(EventKind::ShutdownRequested), 0);
        assert_eq!(h.recorder.processes(EventKind::ProcessStopped), vec!["port"]);
    }

    #[tokio::test]
    async fn test_preflight_rejects_bad_specs_before_launch() {
        let cases = vec![
            (
                vec![ProcessSpec::new("a", "Sleeper"), ProcessSpec::new("a", "Sleeper")],
                "config_duplicate_process",
            ),
            (vec![ProcessSpec::new("a", " ")], "config_empty_class"),
            (vec![ProcessSpec::new("a", "Probe")], "config_not_a_process"),
            (
                vec![ProcessSpec::new("a", "Sleeper").with_entry_point("drain")],
                "config_unknown_entry_point",
            ),
            (vec![ProcessSpec::new("a", "Port")], "config_missing_param"),
            (vec![ProcessSpec::new("a", "Scheduler")], "config_missing_param"),
        ];

        for (specs, label) in cases {
            let h = Harness::new(Duration::from_secs(1));
            let sup = h.supervisor();
            let err = sup.run_until(specs, std::future::pending()).await.unwrap_err();
            assert_eq!(err.as_label(), label);
            assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);
            assert!(!h.cfg.pid_file.exists());
            assert_eq!(h.probe().started.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_nested_scalar_mismatch_aborts_startup() {
        let bad = ConfigStore::from_toml_str("[db]\nport = \"not-a-number\"\n").unwrap();
        let h = Harness::with_store(Duration::from_secs(1), bad);
        let sup = h.supervisor();
        let states = sup.state();
        let specs = vec![
            ProcessSpec::new("sleeper", "Sleeper"),
            ProcessSpec::new("repo", "Repo"),
        ];

        let err = sup.run_until(specs, std::future::pending()).await.unwrap_err();
        assert_eq!(err.as_label(), "config_scalar_mismatch");
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);
        assert_eq!(*states.borrow(), State::Stopped);
        assert!(!h.cfg.pid_file.exists());
        assert_eq!(h.probe().started.load(Ordering::SeqCst), 0);
        assert_eq!(h.recorder.count(EventKind::ProcessStarting), 0);

        let good = ConfigStore::from_toml_str("[db]\nport = 5432\n").unwrap();
        let h = Harness::with_store(Duration::from_secs(1), good);
        let result = h
            .supervisor()
            .run_until(vec![ProcessSpec::new("repo", "Repo")], std::future::pending())
            .await;
        assert!(result.is_ok());
        assert_eq!(h.recorder.processes(EventKind::ProcessStopped), vec!["repo"]);
    }

    trait Store: Send + Sync {
        fn put(&self, key: &str, value: &str);
        fn get(&self, key: &str) -> Option<String>;
    }

    #[derive(Default)]
    struct InMemoryStore {
        entries: Mutex<Vec<(String, String)>>,
    }

    impl Component for InMemoryStore {}

    impl Store for InMemoryStore {
        fn put(&self, key: &str, value: &str) {
            self.entries.lock().unwrap().push((key.into(), value.into()));
        }
        fn get(&self, key: &str) -> Option<String> {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[derive(Default)]
    struct Worker {
        ctx: ProcessContext,
        store: Option<Arc<dyn Store>>,
    }

    impl Component for Worker {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.reference::<dyn Store>("store", |w, s| w.store = Some(s))
        }

        fn init(&mut self) -> Result<(), HookError> {
            if self.store.is_none() {
                return Err(HookError::new("store missing"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Process for Worker {
        fn bind(&mut self, ctx: ProcessContext) {
            self.ctx = ctx;
        }

        async fn execute(&self) -> Result<(), ProcessError> {
            let store = self
                .store
                .as_ref()
                .ok_or_else(|| ProcessError::fail("store missing"))?;
            store.put("worker", "running");
            self.ctx.cancelled().await;
            store.put("worker", "stopped");
            Ok(())
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cache_worker_stops_on_interrupt() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::with_builtins(vec![
            Declaration::provide::<InMemoryStore, dyn Store>(|s| s).named("Cache"),
            Declaration::process::<Worker>(),
        ])
        .unwrap();
        let container = Container::new(registry, Arc::new(ConfigStore::new()));
        let sup = Supervisor::builder(Arc::clone(&container))
            .with_config(SupervisorConfig {
                grace: Duration::from_secs(5),
                pid_file: dir.path().join("pid"),
                ..SupervisorConfig::default()
            })
            .build();

        let run = tokio::spawn(async move { sup.run(vec![ProcessSpec::new("Worker", "Worker")]).await });

        let cache = container.get::<dyn Store>("Cache").unwrap();
        // `run` registers the signal handlers on its first poll, before any
        // process is launched, so the worker running implies they are in place.
        wait_until(|| cache.get("worker").as_deref() == Some("running")).await;

        let pid = pidfile::send_stop(&dir.path().join("pid")).unwrap();
        assert_eq!(pid, std::process::id());

        let result = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(cache.get("worker").as_deref(), Some("stopped"));
    }
}
