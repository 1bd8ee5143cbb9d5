//! Processes: declarations, the launchable trait, typed parameters and the
//! built-in scheduler.
//!
//! ## Contents
//! - [`ProcessSpec`] one configured process (name, class, params, entry point)
//! - [`Process`], [`ProcessContext`] what the supervisor launches and hands over
//! - [`Params`] per-kind parameter tables, validated before launch
//! - [`Scheduler`], [`Job`] interval runner registered as `Scheduler`

mod params;
#[allow(clippy::module_inception)]
mod process;
mod scheduler;
mod spec;

pub use params::Params;
pub use process::{Process, ProcessContext};
pub(crate) use process::{Launcher, ProcessRun};
pub use scheduler::{Job, ScheduledJob, Scheduler};
pub use spec::{DEFAULT_ENTRY_POINT, ProcessSpec};
