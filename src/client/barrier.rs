//! The reload barrier: ordering gate for pending reloads.
//!
//! The application manifest and the changed component file are written to
//! disk independently, so a component notification can arrive while the
//! manifest is still being rebuilt. The barrier holds those reloads back
//! until the manifest sentinel notification releases them.

use std::collections::VecDeque;

/// FIFO queue of reloads deferred until the manifest rebuild completes.
///
/// Two logical modes per cycle: gathering (the default - non-sentinel
/// notifications enqueue) and released (the sentinel drains the whole
/// queue in arrival order, after which the barrier is gathering again).
/// One barrier gates all pending reloads; there is no per-file gate.
///
/// Mutated only from the single event-handling task, so no lock is
/// needed; callers must finish enqueueing before yielding back to the
/// event loop so a release cannot overtake a same-tick enqueue.
#[derive(Debug, Default)]
pub struct ReloadBarrier {
    pending: VecDeque<String>,
}

impl ReloadBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defer a reload until the next manifest sentinel.
    pub fn enqueue(&mut self, logical_path: String) {
        self.pending.push_back(logical_path);
    }

    /// Release every pending reload in arrival order and reset for the
    /// next cycle. An empty queue yields an empty batch - the reset to
    /// gathering still happens, it is just a no-op.
    pub fn release_all(&mut self) -> Vec<String> {
        self.pending.drain(..).collect()
    }

    /// Number of reloads waiting on the manifest.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
