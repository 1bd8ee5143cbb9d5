//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the supervisor and the
//! process tasks it launches.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor` (shutdown events), process tasks (starting,
//!   stopped, failed, skipped), the canceller task (shutdown requested).
//! - **Consumers**: the supervisor's subscriber listener, which fans out to the
//!   `SubscriberSet` (`LogWriter`, `AliveTracker`, user subscribers).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
