//! Event debouncing for live reload.
//!
//! Coalesces bursts of change events for the same path into a single
//! notification, emitted one debounce window after the most recent event.
//! Editors typically emit several filesystem events per save; without
//! debouncing each save would trigger multiple browser reloads.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default debounce window in milliseconds.
pub(crate) const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Thread-safe per-path event debouncer.
///
/// Each submitted path holds at most one pending deadline. Submitting a
/// path that is already pending replaces its deadline, so a burst of N
/// events within the window drains as exactly one notification, timed
/// one window after the last event of the burst.
pub(crate) struct Debouncer {
    pending: Mutex<HashMap<PathBuf, Instant>>,
    window: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the specified window.
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Record a change event for `path`.
    ///
    /// Thread-safe, can be called from the watcher task. Resets the
    /// pending deadline if one already exists for this path.
    pub(crate) fn submit(&self, path: PathBuf) {
        let deadline = Instant::now() + self.window;
        self.pending.lock().unwrap().insert(path, deadline);
    }

    /// Drain paths whose debounce deadline has passed.
    ///
    /// Each drained path is removed from the pending set, so it is
    /// emitted at most once per coalescing window.
    pub(crate) fn drain_ready(&self) -> Vec<PathBuf> {
        let mut pending = self.pending.lock().unwrap();
        let now = Instant::now();

        let ready: Vec<PathBuf> = pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();

        for path in &ready {
            pending.remove(path);
        }

        ready
    }

    /// Drop all pending entries without emitting them.
    ///
    /// Used at shutdown. Returns the number of cancelled entries.
    pub(crate) fn cancel_all(&self) -> usize {
        let mut pending = self.pending.lock().unwrap();
        let cancelled = pending.len();
        pending.clear();
        cancelled
    }
}
