//! The dev reload server.
//!
//! Serves the application manifest at its well-known location, exposes a
//! health check, and fans reload notifications out to every connected
//! WebSocket client. The watch orchestrator runs as a background task;
//! when it cannot start, the server continues without file watching.

use std::path::PathBuf;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::channel::{EventEnvelope, ReloadChannel, ReloadEvent};
use crate::config::Settings;
use crate::watcher::WatchOrchestrator;

#[derive(Clone)]
struct AppState {
    channel: ReloadChannel,
    manifest_file: PathBuf,
}

/// Run the dev reload server until ctrl-c.
pub async fn serve(settings: Settings, bind: Option<String>) -> anyhow::Result<()> {
    crate::logging::init_with_config(&settings.logging);

    let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
    let channel = ReloadChannel::new(settings.server.channel_capacity);
    let ct = CancellationToken::new();

    // Watch-setup errors are fatal to the watch feature only
    match WatchOrchestrator::builder()
        .settings(settings.clone())
        .channel(channel.clone())
        .build()
    {
        Ok(orchestrator) => {
            let watcher_ct = ct.clone();
            tokio::spawn(async move {
                tokio::select! {
                    result = orchestrator.watch() => {
                        if let Err(e) = result {
                            tracing::error!("[watcher] error: {e}");
                        }
                    }
                    _ = watcher_ct.cancelled() => {
                        crate::log_event!("watcher", "stopped");
                    }
                }
            });
        }
        Err(e) => {
            tracing::warn!("[watcher] failed to start: {e}");
            tracing::warn!("[watcher] continuing without file watching");
        }
    }

    let state = AppState {
        channel,
        manifest_file: settings.manifest_file(),
    };

    let router = Router::new()
        .route("/app.json", get(serve_manifest))
        .route("/health", get(health_check))
        .route("/ws", get(ws_upgrade))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    crate::log_event!("server", "listening", "http://{bind}");
    crate::log_event!("server", "manifest", "http://{bind}/app.json");
    crate::log_event!("server", "notifications", "ws://{bind}/ws");

    let server = axum::serve(listener, router);

    tokio::select! {
        result = server => {
            result?;
        }
        _ = shutdown_signal() => {
            crate::log_event!("server", "shutting down");
            ct.cancel();
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[server] failed to listen for ctrl-c: {e}");
    }
}

async fn health_check() -> &'static str {
    "OK"
}

/// Serve the manifest document from its physical location.
async fn serve_manifest(State(state): State<AppState>) -> Response {
    match tokio::fs::read(&state.manifest_file).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
        Err(e) => {
            tracing::warn!(
                "[server] cannot read manifest {}: {e}",
                state.manifest_file.display()
            );
            (StatusCode::NOT_FOUND, "manifest not found").into_response()
        }
    }
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| client_connection(socket, state.channel.subscribe()))
}

/// Forward broadcast reload events to one connected client.
async fn client_connection(mut socket: WebSocket, mut receiver: broadcast::Receiver<ReloadEvent>) {
    crate::debug_event!("server", "client connected");

    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Ok(event) => {
                    let Ok(frame) = serde_json::to_string(&EventEnvelope::reload(event)) else {
                        continue;
                    };
                    if socket.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("[server] client lagged by {n} notifications");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            // Nothing flows client-to-server; watch for disconnect
            message = socket.recv() => match message {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }

    crate::debug_event!("server", "client disconnected");
}
