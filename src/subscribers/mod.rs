//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! process task ── publish(Event) ──► Bus ──► subscriber listener (Supervisor)
//!                                               │
//!                                               ├──► AliveTracker::update (inline)
//!                                               └──► SubscriberSet::emit
//!                                                        ├──► LogWriter
//!                                                        └──► user subscribers
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub(crate) use set::panic_message;
pub use subscribe::Subscribe;
