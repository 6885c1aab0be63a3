//! Debouncing for file change events.
//!
//! Editors routinely write a file several times per save (temp file,
//! rename, metadata touch). Debouncing collapses those bursts so each
//! save publishes one reload notification instead of several.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// One pending change: when it first arrived and when it last changed.
#[derive(Debug, Clone, Copy)]
struct PendingChange {
    /// Arrival position, assigned when the path first enters pending.
    /// Later writes to the same path reset the timer but keep this slot.
    arrival: u64,
    last_change: Instant,
}

/// Debounces file change events by path.
///
/// Records change timestamps and returns paths that have been stable
/// for the configured duration. Paths that settle in the same tick are
/// returned in arrival order: the client barrier releases on the
/// manifest sentinel, so the sentinel must never be published ahead of
/// a component change that arrived before it.
#[derive(Debug)]
pub struct Debouncer {
    /// Pending changes by path.
    pending: HashMap<PathBuf, PendingChange>,
    /// How long a file must be stable before publishing.
    duration: Duration,
    /// Next arrival position.
    next_arrival: u64,
}

impl Debouncer {
    /// Create a new debouncer with the given duration in milliseconds.
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            duration: Duration::from_millis(debounce_ms),
            next_arrival: 0,
        }
    }

    /// Record a file change event, resetting the timer for this path.
    pub fn record(&mut self, path: PathBuf) {
        let now = Instant::now();
        match self.pending.get_mut(&path) {
            Some(change) => change.last_change = now,
            None => {
                self.pending.insert(
                    path,
                    PendingChange {
                        arrival: self.next_arrival,
                        last_change: now,
                    },
                );
                self.next_arrival += 1;
            }
        }
    }

    /// Drop a path from pending (e.g. the file was removed before it
    /// settled; removals never notify clients).
    pub fn remove(&mut self, path: &PathBuf) {
        self.pending.remove(path);
    }

    /// Take all paths that have been stable for the debounce duration,
    /// in arrival order.
    ///
    /// Removes returned paths from pending. A path changing again after
    /// this call re-enters the pending set with a fresh arrival position
    /// and will be published again - one notification per settled burst.
    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.pending.retain(|path, change| {
            if now.duration_since(change.last_change) >= self.duration {
                ready.push((change.arrival, path.clone()));
                false
            } else {
                true
            }
        });

        ready.sort_by_key(|(arrival, _)| *arrival);
        ready.into_iter().map(|(_, path)| path).collect()
    }

    /// Check if there are any pending changes.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_settled_change_becomes_ready() {
        let mut debouncer = Debouncer::new(50);

        let path = PathBuf::from("/proj/app/widgets/foo.json");
        debouncer.record(path.clone());

        // Immediately after, nothing should be ready
        assert!(debouncer.take_ready().is_empty());
        assert!(debouncer.has_pending());

        sleep(Duration::from_millis(60));

        let ready = debouncer.take_ready();
        assert_eq!(ready, vec![path]);
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn test_new_write_resets_the_timer() {
        let mut debouncer = Debouncer::new(50);

        let path = PathBuf::from("/proj/public/app.json");
        debouncer.record(path.clone());

        sleep(Duration::from_millis(30));
        debouncer.record(path.clone());

        // 60ms from the first write but only 30ms from the second
        sleep(Duration::from_millis(30));
        assert!(debouncer.take_ready().is_empty());

        sleep(Duration::from_millis(30));
        assert_eq!(debouncer.take_ready().len(), 1);
    }

    #[test]
    fn test_burst_publishes_once_then_rearms() {
        let mut debouncer = Debouncer::new(30);

        let path = PathBuf::from("/proj/app/a.json");
        debouncer.record(path.clone());
        debouncer.record(path.clone());
        debouncer.record(path.clone());

        sleep(Duration::from_millis(40));
        assert_eq!(debouncer.take_ready().len(), 1);

        // A later save starts a fresh cycle
        debouncer.record(path.clone());
        sleep(Duration::from_millis(40));
        assert_eq!(debouncer.take_ready().len(), 1);
    }

    #[test]
    fn test_removed_path_never_becomes_ready() {
        let mut debouncer = Debouncer::new(30);

        let path = PathBuf::from("/proj/app/gone.json");
        debouncer.record(path.clone());
        debouncer.remove(&path);

        sleep(Duration::from_millis(40));
        assert!(debouncer.take_ready().is_empty());
    }

    #[test]
    fn test_same_tick_batch_keeps_arrival_order() {
        // A component save followed by the manifest rebuild inside one
        // debounce window must publish in that order: the manifest is
        // the barrier sentinel and releasing before the component
        // change arrives would strand it in the client queue.
        for _ in 0..64 {
            let mut debouncer = Debouncer::new(0);

            debouncer.record(PathBuf::from("/proj/app/widgets/a.json"));
            debouncer.record(PathBuf::from("/proj/public/app.json"));

            assert_eq!(
                debouncer.take_ready(),
                vec![
                    PathBuf::from("/proj/app/widgets/a.json"),
                    PathBuf::from("/proj/public/app.json"),
                ]
            );
        }
    }

    #[test]
    fn test_rewrite_of_pending_path_keeps_its_arrival_slot() {
        let mut debouncer = Debouncer::new(0);

        debouncer.record(PathBuf::from("/proj/app/a.json"));
        debouncer.record(PathBuf::from("/proj/public/app.json"));
        // A second write to the component resets its timer, not its
        // position in the batch
        debouncer.record(PathBuf::from("/proj/app/a.json"));

        assert_eq!(
            debouncer.take_ready(),
            vec![
                PathBuf::from("/proj/app/a.json"),
                PathBuf::from("/proj/public/app.json"),
            ]
        );
    }
}
