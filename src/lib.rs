//! # bootvisor
//!
//! **Bootvisor** boots an application from configuration: it wires components
//! through a small inversion-of-control container, launches the configured
//! long-running processes and drives one graceful shutdown.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Declaration  Declaration  Declaration        config/app.{env}.toml
//!        │            │            │                      │
//!        ▼            ▼            ▼                      ▼
//! ┌──────────────────────────────────────┐     ┌──────────────────────┐
//! │ Registry (normalized descriptors,    │     │ ConfigStore          │
//! │ names, capabilities, cycle check)    │     │ (read-only values)   │
//! └──────────────────┬───────────────────┘     └──────────┬───────────┘
//!                    └────────────────┬───────────────────┘
//!                                     ▼
//!                   ┌───────────────────────────────────┐
//!                   │ Container                         │
//!                   │  - singleton cache (one mutex)    │
//!                   │  - construct → inject → init      │
//!                   │  - nested / reference / scalar    │
//!                   └─────────────────┬─────────────────┘
//!                                     │ launch(ProcessSpec)
//!                                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │ Supervisor  INIT → STARTING → RUNNING → STOPPING → STOPPED        │
//! │  - pid file                                                       │
//! │  - signal listener ─oneshot─► canceller ─► shared token           │
//! │  - one task per process; JoinSet; bounded grace                   │
//! └──────┬──────────────────────────┬─────────────────────────────────┘
//!        ▼                          ▼
//!    Process::call(entry)       Bus (broadcast) ─► AliveTracker
//!    until token cancelled                      └► SubscriberSet ─► LogWriter, ...
//! ```
//!
//! ### Resolution
//! ```text
//! resolve(name) ─► cached singleton? ─► yes: shared Arc
//!                         │
//!                         no
//!                         ▼
//!   T::default() ─► app context ─► construct() ─► fields (in declaration order)
//!                                                   ├─ nested:    fresh value
//!                                                   ├─ reference: shared Arc
//!                                                   └─ scalar:    config value
//!                                               ─► init() ─► cache (singleton)
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types                                  |
//! |-------------------|-------------------------------------------------------------------|--------------------------------------------|
//! | **Wiring**        | Declare injection points without reflection.                     | [`Component`], [`Wiring`]                  |
//! | **Registry**      | Normalize declarations, reject duplicates and cycles.            | [`Declaration`], [`Registry`]              |
//! | **Container**     | Resolve singletons and prototypes by name or capability.         | [`Container`], [`Scope`]                   |
//! | **Processes**     | Long-running entry points with typed parameters.                 | [`Process`], [`ProcessSpec`], [`Params`]   |
//! | **Supervision**   | Pid file, signals, one shared cancellation, bounded grace.       | [`Supervisor`], [`SupervisorConfig`]       |
//! | **Events**        | Lifecycle events fanned out to subscribers.                      | [`Event`], [`Subscribe`], [`LogWriter`]    |
//! | **Application**   | Command line, logging, configuration and exit status.            | [`App`]                                    |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use bootvisor::{
//!     Component, ConfigStore, Container, Declaration, Process, ProcessContext, ProcessError,
//!     ProcessSpec, Registry, Supervisor, SupervisorConfig, Wiring,
//! };
//!
//! #[derive(Default)]
//! struct Greeting {
//!     text: String,
//! }
//!
//! impl Component for Greeting {
//!     fn wiring(w: Wiring<Self>) -> Wiring<Self> {
//!         w.value("text", "greeting.text", |g: &mut Greeting, v: String| g.text = v)
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Greeter {
//!     ctx: ProcessContext,
//!     greeting: Option<Arc<Greeting>>,
//! }
//!
//! impl Component for Greeter {
//!     fn wiring(w: Wiring<Self>) -> Wiring<Self> {
//!         w.reference::<Greeting>("greeting", |s, g| s.greeting = Some(g))
//!     }
//! }
//!
//! #[async_trait::async_trait]
//! impl Process for Greeter {
//!     fn bind(&mut self, ctx: ProcessContext) {
//!         self.ctx = ctx;
//!     }
//!
//!     async fn execute(&self) -> Result<(), ProcessError> {
//!         if let Some(g) = &self.greeting {
//!             println!("{}", g.text);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ConfigStore::from_toml_str("[greeting]\ntext = \"hello\"\n")?;
//!     let registry = Registry::with_builtins([
//!         Declaration::component::<Greeting>(),
//!         Declaration::process::<Greeter>(),
//!     ])?;
//!     let container = Container::new(registry, Arc::new(store));
//!
//!     let dir = std::env::temp_dir().join(format!("bootvisor-doc-{}", std::process::id()));
//!     std::fs::create_dir_all(&dir)?;
//!     let sup = Supervisor::builder(container)
//!         .with_config(SupervisorConfig {
//!             grace: Duration::from_secs(5),
//!             pid_file: dir.join("pid"),
//!             ..SupervisorConfig::default()
//!         })
//!         .build();
//!
//!     // Greeter returns on its own, which ends the run.
//!     sup.run_until(vec![ProcessSpec::new("greeter", "Greeter")], std::future::pending())
//!         .await?;
//!     Ok(())
//! }
//! ```

mod app;
mod config;
mod core;
mod error;
mod events;
mod ioc;
mod process;
mod subscribers;

// ---- Public re-exports ----

pub use app::App;
pub use config::{
    ApplicationSettings, ConfigStore, DEFAULT_ENV, ENV_PLACEHOLDER, LogSettings, Scalar,
    ScalarKind, config_path, load as load_config,
};
pub use core::{
    DEFAULT_PID_FILE, State, Supervisor, SupervisorBuilder, SupervisorConfig, pidfile,
    wait_for_shutdown_signal,
};
pub use error::{
    ConfigError, EXIT_CONFIG, EXIT_FAILURE, Hook, HookError, ProcessError, ResolveError,
    RuntimeError,
};
pub use events::{Bus, Event, EventKind};
pub use ioc::{
    AppContext, Component, ComponentDescriptor, Container, Declaration, InjectionPoint, Instance,
    Policy, Registry, Scope, TypeKey, Wiring,
};
pub use process::{
    DEFAULT_ENTRY_POINT, Job, Params, Process, ProcessContext, ProcessSpec, ScheduledJob,
    Scheduler,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
