//! # LogWriter: lifecycle events rendered through `tracing`.
//!
//! Process failures and a blown grace period are warnings or errors; the rest
//! of the lifecycle is logged at `info`, subscriber health at `warn`.
//!
//! ## Example output
//! ```text
//! INFO  process starting process="http"
//! WARN  process failed process="http" reason="bind: address in use"
//! WARN  process skipped process="mailer" reason="component `Smtp` is not registered"
//! INFO  shutdown requested
//! INFO  all processes stopped within grace
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let process = e.process.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::ProcessStarting => {
                tracing::info!(seq = e.seq, process, "process starting");
            }
            EventKind::ProcessStopped => {
                tracing::info!(seq = e.seq, process, "process stopped");
            }
            EventKind::ProcessFailed => {
                tracing::warn!(seq = e.seq, process, reason, "process failed");
            }
            EventKind::ProcessSkipped => {
                tracing::warn!(seq = e.seq, process, reason, "process skipped");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(seq = e.seq, "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!(seq = e.seq, "all processes stopped within grace");
            }
            EventKind::GraceExceeded => {
                tracing::error!(seq = e.seq, grace_ms = ?e.grace_ms, stuck = reason, "grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = process, reason, "subscriber dropped event");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(subscriber = process, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
