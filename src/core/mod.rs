//! Runtime core: lifecycle and shutdown.
//!
//! The only entry point from this module is [`Supervisor`], which launches the
//! configured processes and drives the single graceful shutdown.
//!
//! Internal modules:
//! - [`supervisor`]: state machine, process launch, grace handling;
//! - [`builder`]: assembles a supervisor from a container and configuration;
//! - [`shutdown`]: cross-platform signal handling and the one-shot stop notification;
//! - [`pidfile`]: pid file bookkeeping and the external stop command;
//! - [`alive`]: which processes are still running (for the grace report).

mod alive;
mod builder;
mod config;
pub mod pidfile;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::{DEFAULT_PID_FILE, SupervisorConfig};
pub use shutdown::wait_for_shutdown_signal;
pub use supervisor::{State, Supervisor};
