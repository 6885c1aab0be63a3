//! Client-side reload coordination.
//!
//! Notifications from the server arrive as `json-reload` events. The
//! barrier holds every non-sentinel notification until the manifest
//! rebuild sentinel arrives, then the session fetches the fresh manifest,
//! traverses to each pending fragment in arrival order, and hands the
//! fragments to the component-reload collaborator.

mod barrier;
mod error;
mod manifest;
mod session;
mod ws;

pub use barrier::ReloadBarrier;
pub use error::ReloadError;
pub use manifest::{
    HttpManifestFetcher, ManifestFetcher, RetryPolicy, fetch_fragment, normalize_logical_path,
    traverse,
};
pub use session::{
    ComponentReload, LogComponentReload, LogStateSink, NOTIFICATIONS_KEY, ReloadSession,
    StateSink, UserNotification,
};
pub use ws::run_ws_bridge;

use crate::channel::ReloadChannel;
use crate::config::Settings;

/// Connect to a dev server and run the reload session with logging
/// collaborators until the connection drops.
pub async fn run(server_url: &str, settings: &Settings) -> Result<(), ReloadError> {
    let server_url = server_url.trim_end_matches('/');
    let manifest_url = format!("{server_url}/app.json");
    let ws_url = format!("{}/ws", server_url.replacen("http", "ws", 1));

    let channel = ReloadChannel::new(settings.server.channel_capacity);
    let receiver = channel.subscribe();

    let session = ReloadSession::new(
        settings.manifest_path.clone(),
        HttpManifestFetcher::new(&manifest_url),
        RetryPolicy::default(),
    );

    crate::log_event!("client", "connecting", "{ws_url}");

    tokio::select! {
        result = run_ws_bridge(&ws_url, channel.clone()) => result,
        _ = session.run(receiver) => Ok(()),
    }
}
