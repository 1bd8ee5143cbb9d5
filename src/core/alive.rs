//! # Process liveness tracker with sequence-based ordering.
//!
//! Maintains which processes are currently running, using event sequence
//! numbers to handle out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! process task ──► Bus ──► subscriber listener ──► AliveTracker::update()
//!                                                         │
//!                                                         ▼
//!                                              HashMap<String, ProcessState>
//!                                                  (name → {seq, alive})
//! ```
//!
//! ## Rules
//! - Only `ProcessStarting` / `ProcessStopped` / `ProcessFailed` change alive state
//! - Reads (`snapshot`) are **eventually consistent**
//! - Other events **update seq** but don't affect alive status
//! - Events with `seq <= last_seq` are **rejected** (stale)

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone)]
struct ProcessState {
    last_seq: Option<u64>,
    alive: bool,
}

/// Thread-safe tracker of running processes; the grace-exceeded report reads it.
#[derive(Default)]
pub(crate) struct AliveTracker {
    state: RwLock<HashMap<String, ProcessState>>,
}

impl AliveTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Applies an event if it is newer than the last one seen for its process.
    ///
    /// ```text
    /// update(ProcessStopped, seq=100)  → alive=false, last_seq=100
    /// update(ProcessStarting, seq=99)  → rejected (stale)
    /// ```
    pub(crate) async fn update(&self, ev: &Event) -> bool {
        if ev.is_subscriber_event() {
            return false;
        }
        let Some(name) = ev.process.as_deref() else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(name.to_string()).or_insert(ProcessState {
            last_seq: None,
            alive: false,
        });

        if entry.last_seq.is_some_and(|last| ev.seq <= last) {
            return false;
        }
        entry.last_seq = Some(ev.seq);
        match ev.kind {
            EventKind::ProcessStarting => {
                entry.alive = true;
                true
            }
            EventKind::ProcessStopped | EventKind::ProcessFailed => {
                entry.alive = false;
                true
            }
            _ => false,
        }
    }

    /// Sorted names of processes still running.
    pub(crate) async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, ps)| ps.alive)
            .map(|(name, _)| name.clone())
            .collect();
        alive.sort_unstable();
        alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracks_start_and_stop() {
        let tracker = AliveTracker::new();
        let start = Event::new(EventKind::ProcessStarting).with_process("http");
        let stop = Event::new(EventKind::ProcessStopped).with_process("http");
        let other = Event::new(EventKind::ProcessStarting).with_process("jobs");

        assert!(tracker.update(&start).await);
        assert!(tracker.update(&other).await);
        assert_eq!(tracker.snapshot().await, vec!["http", "jobs"]);

        assert!(tracker.update(&stop).await);
        assert_eq!(tracker.snapshot().await, vec!["jobs"]);
    }

    #[tokio::test]
    async fn test_stale_events_rejected() {
        let tracker = AliveTracker::new();
        let start = Event::new(EventKind::ProcessStarting).with_process("http");
        let stop = Event::new(EventKind::ProcessStopped).with_process("http");

        assert!(tracker.update(&stop).await);
        assert!(!tracker.update(&start).await);
        assert!(tracker.snapshot().await.is_empty());
    }
}
