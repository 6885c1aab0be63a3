//! The client reload session: notifications in, component reloads out.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::channel::ReloadEvent;

use super::barrier::ReloadBarrier;
use super::manifest::{ManifestFetcher, RetryPolicy, fetch_fragment};

/// Fixed state key the user-notification sink writes under.
pub const NOTIFICATIONS_KEY: &str = "NOTIFICATIONS";

/// Transient user-visible notification describing a reload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserNotification {
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl UserNotification {
    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            kind: "info".to_string(),
        }
    }
}

/// Collaborator performing the actual UI patch. Fire-and-forget, assumed
/// idempotent and side-effect-isolated to UI state.
pub trait ComponentReload: Send + Sync {
    fn reload_components_from_path(&self, logical_path: &str, fragment: &Value);
}

/// Key-value state sink for user-visible notifications.
pub trait StateSink: Send + Sync {
    fn set_state(&self, key: &str, notification: UserNotification);
}

/// Default component-reload collaborator: logs the reload.
#[derive(Debug, Default)]
pub struct LogComponentReload;

impl ComponentReload for LogComponentReload {
    fn reload_components_from_path(&self, logical_path: &str, _fragment: &Value) {
        crate::log_event!("client", "reloaded", "{logical_path}");
    }
}

/// Default state sink: logs the notification text.
#[derive(Debug, Default)]
pub struct LogStateSink;

impl StateSink for LogStateSink {
    fn set_state(&self, key: &str, notification: UserNotification) {
        crate::debug_event!("client", key, "{}", notification.msg);
    }
}

/// Drives the barrier-gated two-phase reload on the client.
///
/// Non-sentinel notifications are enqueued while the manifest rebuild is
/// in flight. The sentinel releases the whole batch; released reloads run
/// sequentially, each fetch awaited before the next, so a burst of file
/// changes never stampedes the dev server with parallel identical
/// manifest requests.
pub struct ReloadSession<F: ManifestFetcher> {
    /// The manifest sentinel: its own well-known logical path.
    manifest_path: String,
    barrier: ReloadBarrier,
    fetcher: F,
    retry: RetryPolicy,
    reloader: Box<dyn ComponentReload>,
    sink: Box<dyn StateSink>,
}

impl<F: ManifestFetcher> ReloadSession<F> {
    /// Create a session with logging collaborators.
    pub fn new(manifest_path: String, fetcher: F, retry: RetryPolicy) -> Self {
        Self {
            manifest_path,
            barrier: ReloadBarrier::new(),
            fetcher,
            retry,
            reloader: Box::new(LogComponentReload),
            sink: Box::new(LogStateSink),
        }
    }

    /// Replace the component-reload collaborator.
    pub fn with_reloader(mut self, reloader: impl ComponentReload + 'static) -> Self {
        self.reloader = Box::new(reloader);
        self
    }

    /// Replace the user-notification sink.
    pub fn with_sink(mut self, sink: impl StateSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Consume notifications until the channel closes.
    pub async fn run(mut self, mut receiver: broadcast::Receiver<ReloadEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.handle(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("[client] lagged by {n} notifications");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    crate::debug_event!("client", "channel closed");
                    break;
                }
            }
        }
    }

    /// Handle one notification: sentinel releases, everything else waits.
    ///
    /// The enqueue completes before this returns to the event loop, so a
    /// release can never overtake a same-tick enqueue.
    pub async fn handle(&mut self, event: ReloadEvent) {
        crate::debug_event!("client", "received", "{}", event.path);

        if event.path == self.manifest_path {
            let pending = self.barrier.release_all();
            if pending.is_empty() {
                crate::debug_event!("client", "manifest rebuilt", "nothing pending");
                return;
            }

            crate::log_event!("client", "manifest rebuilt", "releasing {}", pending.len());
            for logical_path in pending {
                // Sequential: each fetch finishes before the next starts
                self.reload_one(&logical_path).await;
            }
        } else {
            self.barrier.enqueue(event.path);
        }
    }

    /// Fetch the fresh manifest and splice one fragment.
    ///
    /// A traversal failure abandons this reload only; the session and the
    /// barrier stay healthy for subsequent cycles.
    async fn reload_one(&self, logical_path: &str) {
        self.sink.set_state(
            NOTIFICATIONS_KEY,
            UserNotification::info(format!("File changed. Reloading: {logical_path}")),
        );

        match fetch_fragment(&self.fetcher, &self.retry, logical_path).await {
            Ok((normalized, fragment)) => {
                self.reloader
                    .reload_components_from_path(&normalized, &fragment);
            }
            Err(e) => {
                tracing::error!("[client] reload abandoned for {logical_path}: {e}");
            }
        }
    }

    /// Number of reloads currently gated on the manifest.
    pub fn pending_count(&self) -> usize {
        self.barrier.pending_count()
    }
}
