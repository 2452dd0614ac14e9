//! Progress event bus.
//!
//! Synchronous in-process publish/subscribe for progress snapshots.
//! Publishing fans out to every subscribed sink in subscription order,
//! on the publishing worker thread. There is no buffering and no replay
//! for late subscribers; a sink that needs a different thread (UI, a
//! dedicated writer) must hand off itself, typically over a channel.

use crate::model::JobProgress;
use std::sync::{Arc, Mutex};

/// A subscriber reacting to progress snapshots.
///
/// Called synchronously on the publishing thread; implementations must
/// not block the copy pipeline indefinitely and must not mutate the
/// snapshot (they receive a shared view of state owned by the worker).
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: &JobProgress);
}

/// Fan-out bus connecting running jobs to their sinks.
pub struct ProgressBus {
    sinks: Mutex<Vec<Arc<dyn ProgressSink>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        ProgressBus {
            sinks: Mutex::new(Vec::new()),
        }
    }

    /// Register a sink; delivery order follows subscription order.
    pub fn subscribe(&self, sink: Arc<dyn ProgressSink>) {
        self.sinks.lock().unwrap().push(sink);
    }

    /// Deliver a snapshot to every sink, in order, on this thread.
    pub fn publish(&self, progress: &JobProgress) {
        // Snapshot the subscriber list so a sink subscribing re-entrantly
        // cannot deadlock the bus.
        let sinks: Vec<Arc<dyn ProgressSink>> = self.sinks.lock().unwrap().clone();
        for sink in sinks {
            sink.on_progress(progress);
        }
    }

    /// Number of subscribed sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.lock().unwrap().len()
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        ProgressBus::new()
    }
}
