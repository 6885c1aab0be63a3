//! WebSocket bridge: server frames in, local reload events out.

use futures_util::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::channel::{EventEnvelope, JSON_RELOAD_EVENT, ReloadChannel};

use super::error::ReloadError;

/// Connect to the dev server's notification endpoint and forward every
/// `json-reload` frame into the local channel until the connection drops.
pub async fn run_ws_bridge(url: &str, channel: ReloadChannel) -> Result<(), ReloadError> {
    let (stream, _) = connect_async(url).await.map_err(|e| ReloadError::Connect {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    crate::log_event!("client", "connected", "{url}");

    let (_write, mut read) = stream.split();

    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<EventEnvelope>(text.as_str()) {
                Ok(envelope) if envelope.event == JSON_RELOAD_EVENT => {
                    channel.send(envelope.data);
                }
                Ok(envelope) => {
                    crate::debug_event!("client", "ignoring event", "{}", envelope.event);
                }
                Err(e) => {
                    tracing::warn!("[client] malformed frame: {e}");
                }
            },
            Ok(Message::Close(_)) => {
                crate::log_event!("client", "server closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("[client] connection error: {e}");
                break;
            }
        }
    }

    Ok(())
}
