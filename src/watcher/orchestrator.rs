//! The watch orchestrator: file events in, reload notifications out.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};

use crate::alias::AliasTable;
use crate::channel::{ReloadChannel, ReloadEvent};
use crate::config::Settings;

use super::debouncer::Debouncer;
use super::error::WatchError;
use super::patterns::{PatternSet, load_patterns_and_overrides};

/// Owns the watcher lifecycle and the authoritative pattern set.
///
/// Raw `notify` events are filtered through the compiled glob set,
/// debounced, rewritten to logical paths, and published on the reload
/// channel. When the changed file is the root application manifest, the
/// published path is the manifest's own logical path - the sentinel
/// clients gate pending reloads on.
pub struct WatchOrchestrator {
    /// Compiled glob filter over project + ensemble patterns.
    patterns: PatternSet,
    /// Physical-to-logical path rewriting.
    alias: AliasTable,
    /// Workspace root for resolution and short logging.
    root: PathBuf,
    /// Logical path of the root manifest; doubles as the wire sentinel.
    manifest_path: String,
    /// Directories watched recursively: the root plus ensemble roots.
    watch_roots: Vec<PathBuf>,
    /// Shared debouncer for modification bursts.
    debouncer: Debouncer,
    /// Channel for receiving raw file events.
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    /// The underlying file watcher.
    watcher: notify::RecommendedWatcher,
    /// Where reload notifications are published.
    channel: ReloadChannel,
}

impl WatchOrchestrator {
    /// Create a builder for configuring the orchestrator.
    pub fn builder() -> WatchOrchestratorBuilder {
        WatchOrchestratorBuilder::new()
    }

    /// Start watching for file changes.
    ///
    /// The main event loop:
    /// 1. Receives raw file events from notify (post-start changes only)
    /// 2. Filters them through the pattern set
    /// 3. Debounces modification bursts
    /// 4. Rewrites settled paths to logical form and publishes them
    pub async fn watch(mut self) -> Result<(), WatchError> {
        let mut watched = 0usize;
        let roots = std::mem::take(&mut self.watch_roots);
        for dir in &roots {
            match self.watcher.watch(dir, RecursiveMode::Recursive) {
                Ok(_) => {
                    crate::debug_event!("watcher", "watching", "{}", dir.display());
                    watched += 1;
                }
                Err(e) => {
                    tracing::warn!("[watcher] failed to watch {}: {e}", dir.display());
                }
            }
        }

        if watched == 0 {
            return Err(WatchError::InitFailed {
                reason: "no watchable roots".to_string(),
            });
        }

        crate::log_event!(
            "watcher",
            "started",
            "{} patterns over {watched} roots",
            self.patterns.len()
        );

        loop {
            // Periodic check for debounced events
            let timeout = sleep(Duration::from_millis(100));
            tokio::pin!(timeout);

            tokio::select! {
                // Handle incoming file events
                Some(res) = self.event_rx.recv() => {
                    match res {
                        Ok(event) => self.handle_event(event),
                        Err(e) => {
                            tracing::error!("[watcher] file watch error: {e}");
                        }
                    }
                }

                // Publish settled changes
                _ = &mut timeout => {
                    let ready = self.debouncer.take_ready();
                    for path in ready {
                        self.publish_change(&path);
                    }
                }
            }
        }
    }

    /// Route one raw notify event into the debouncer.
    fn handle_event(&mut self, event: Event) {
        for path in event.paths {
            if !self.patterns.matches(&path, &self.root) {
                crate::debug_event!("watcher", "unmatched", "{:?} {}", event.kind, path.display());
                continue;
            }

            match event.kind {
                // Adds and changes both notify clients; removals never do.
                EventKind::Create(_) | EventKind::Modify(_) => {
                    self.debouncer.record(path);
                }
                EventKind::Remove(_) => {
                    self.debouncer.remove(&path);
                }
                _ => {}
            }
        }
    }

    /// Rewrite a settled physical change and publish the notification.
    ///
    /// The rewrite is pure and total, so re-entrant bursts of distinct
    /// paths need no mutual exclusion - each publish is independent.
    pub fn publish_change(&self, path: &Path) {
        let logical = self.alias.rewrite(path, &self.root);

        if logical == self.manifest_path {
            crate::log_event!("watcher", "manifest rebuilt", "{logical}");
        } else {
            crate::log_event!("watcher", "reload", "{logical}");
        }

        self.channel.send(ReloadEvent::new(logical));
    }

    /// The sentinel logical path this orchestrator publishes for the
    /// root manifest.
    pub fn manifest_path(&self) -> &str {
        &self.manifest_path
    }
}

/// Builder for constructing a WatchOrchestrator.
pub struct WatchOrchestratorBuilder {
    settings: Option<Settings>,
    channel: Option<ReloadChannel>,
}

impl WatchOrchestratorBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            settings: None,
            channel: None,
        }
    }

    /// Set the settings the pattern set and alias table derive from.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Set the channel reload notifications publish to.
    pub fn channel(mut self, channel: ReloadChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Build the WatchOrchestrator.
    pub fn build(self) -> Result<WatchOrchestrator, WatchError> {
        let settings = self.settings.ok_or_else(|| WatchError::InitFailed {
            reason: "Settings are required".to_string(),
        })?;
        let channel = self.channel.ok_or_else(|| WatchError::InitFailed {
            reason: "Channel is required".to_string(),
        })?;

        let root = settings.resolved_root();

        // Best-effort: malformed ensemble config degrades to defaults
        let (patterns, overrides) = load_patterns_and_overrides(&settings);

        let mut watch_roots = vec![root.clone()];
        watch_roots.extend(
            overrides
                .iter()
                .filter(|o| o.watch_enabled)
                .map(|o| o.physical_root.clone()),
        );

        let pattern_set = PatternSet::compile(&patterns);
        let alias = AliasTable::new(overrides);

        // Create channel for raw events
        let (tx, rx) = mpsc::channel(100);

        // The notify watcher only reports post-start changes, which gives
        // the "ignore pre-existing files" startup behavior.
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        Ok(WatchOrchestrator {
            patterns: pattern_set,
            alias,
            root,
            manifest_path: settings.manifest_path.clone(),
            watch_roots,
            debouncer: Debouncer::new(settings.watch.debounce_ms),
            event_rx: rx,
            watcher,
            channel,
        })
    }
}

impl Default for WatchOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
