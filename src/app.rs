//! # Application entry: command line, logging, configuration and run mode.
//!
//! ```text
//! argv ──► normalize (-start → --start) ──► clap
//!                                            │
//!              load config (template, -e env)┘
//!                    │
//!          ┌─────────┴──────────┐
//!       -stop                 -start (default)
//!  pidfile::send_stop     Registry ─► Container ─► Supervisor::run(application.process)
//! ```
//!
//! Exit status: `0` clean, [`EXIT_CONFIG`] for configuration errors,
//! [`EXIT_FAILURE`] for other runtime failures.

use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{self, ApplicationSettings, ConfigStore, DEFAULT_ENV, LogSettings};
use crate::core::{Supervisor, SupervisorConfig, pidfile};
use crate::error::{EXIT_CONFIG, EXIT_FAILURE, RuntimeError};
use crate::ioc::{Container, Declaration, Registry};
use crate::subscribers::Subscribe;

/// Long flags that are also accepted with a single dash.
const LEGACY_FLAGS: &[&str] = &["start", "stop", "env", "help", "version"];

#[derive(Parser, Debug)]
#[command(
    name = "bootvisor",
    version,
    about = "Starts or stops a supervised application",
    help_template = "{name} {version}\n{about}\n\n{usage-heading} {usage}\n\n{all-args}"
)]
struct Cli {
    /// Start the application (default)
    #[arg(long, default_value_t = true)]
    start: bool,

    /// Stop the running instance recorded in the pid file
    #[arg(long)]
    stop: bool,

    /// Environment substituted for `{env}` in configuration paths
    #[arg(short = 'e', long = "env", default_value = DEFAULT_ENV)]
    env: String,
}

/// Rewrites `-start`, `-stop`, `-env`, `-help` and `-version` to their `--` form.
fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let legacy = arg
                .to_str()
                .and_then(|s| s.strip_prefix('-'))
                .filter(|rest| !rest.starts_with('-'))
                .and_then(|rest| {
                    let name = rest.split('=').next().unwrap_or(rest);
                    LEGACY_FLAGS.contains(&name).then(|| format!("--{rest}"))
                });
            legacy.map(OsString::from).unwrap_or(arg)
        })
        .collect()
}

/// A bootable application: configuration template plus registered components.
///
/// # Example
/// ```no_run
/// use bootvisor::{App, Declaration};
///
/// fn main() -> std::process::ExitCode {
///     App::new("config/app.{env}.toml").run()
/// }
/// ```
pub struct App {
    config_template: String,
    declarations: Vec<Declaration>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl App {
    /// Creates an application loading its configuration from `config_template`
    /// (`{env}` is replaced by the `-e` value).
    pub fn new(config_template: impl Into<String>) -> Self {
        Self {
            config_template: config_template.into(),
            declarations: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Registers a component or process.
    pub fn register(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Adds an event subscriber.
    pub fn subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Parses the process arguments and runs the selected mode.
    pub fn run(self) -> ExitCode {
        ExitCode::from(self.status(std::env::args_os()))
    }

    /// Like [`run`](Self::run) with explicit arguments (first is the program name).
    pub fn run_from<I, T>(self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        ExitCode::from(self.status(args))
    }

    fn status<I, T>(self, args: I) -> u8
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let cli = match Cli::try_parse_from(normalize_args(args)) {
            Ok(cli) => cli,
            Err(e) => {
                let _ = e.print();
                return u8::try_from(e.exit_code()).unwrap_or(EXIT_FAILURE);
            }
        };
        match self.execute(cli) {
            Ok(()) => 0,
            Err(e) => {
                tracing::error!(error = %e, label = e.as_label(), "application failed");
                e.exit_code()
            }
        }
    }

    fn execute(self, cli: Cli) -> Result<(), RuntimeError> {
        let loaded = config::load(&self.config_template, &cli.env);
        let level = match &loaded {
            Ok(store) => LogSettings::from_store(store).unwrap_or_default().level,
            Err(_) => LogSettings::default().level,
        };
        init_tracing(&level);
        tracing::debug!(start = cli.start, stop = cli.stop, env = %cli.env, "command line");

        let store = loaded?;
        let supervisor_cfg = SupervisorConfig::from_store(&store)?;
        if cli.stop {
            let pid = pidfile::send_stop(&supervisor_cfg.pid_file)?;
            tracing::info!(pid, "stop requested");
            return Ok(());
        }
        self.start(store, supervisor_cfg, &cli.env)
    }

    fn start(
        self,
        store: ConfigStore,
        supervisor_cfg: SupervisorConfig,
        env: &str,
    ) -> Result<(), RuntimeError> {
        let settings = ApplicationSettings::from_store(&store)?;
        let registry = Registry::with_builtins(self.declarations)?;
        let container = Container::new(registry, Arc::new(store));

        tracing::info!(
            application = settings.name.as_deref().unwrap_or("-"),
            env,
            processes = settings.process.len(),
            components = container.registry().len(),
            "starting"
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(async {
            let supervisor = Supervisor::builder(container)
                .with_config(supervisor_cfg)
                .with_subscribers(self.subscribers)
                .build();
            supervisor.run(settings.process).await
        })
    }
}

/// Installs the `fmt` subscriber; `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
