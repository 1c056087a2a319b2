//! Streaming-host WebSocket endpoint.
//!
//! Carries the host protocol in both directions: inbound text frames parse
//! as [`StreamCommand`] and apply strictly in arrival order; outbound
//! [`StreamMessage`]s come from the broadcast bridge every service writes
//! to. At most one host is connected; a new connection displaces the
//! previous one.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use tokio::sync::broadcast;

use crate::api::AppState;
use crate::messages::StreamCommand;

/// WebSocket upgrade handler for `/ws/stream`.
pub async fn stream_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_stream_ws(socket, state))
}

async fn handle_stream_ws(socket: WebSocket, state: AppState) {
    // The newest host wins; any previous handler is force-closed before
    // this one registers so its guard cannot outlive the displacement.
    let displaced = state.stream_connections.close_all();
    if displaced > 0 {
        log::info!("[StreamWs] New host connection displaces the previous one");
    }
    let conn_guard = state.stream_connections.register();
    let cancel_token = conn_guard.cancel_token().clone();
    log::info!("[StreamWs] Streaming host connected: {}", conn_guard.id());

    let (mut sender, mut receiver) = socket.split();
    let mut outbound = state.bridge.subscribe();

    loop {
        tokio::select! {
            // Handle force-close request
            _ = cancel_token.cancelled() => {
                log::info!("[StreamWs] Connection force-closed: {}", conn_guard.id());
                break;
            }
            // Handle incoming commands from the host
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<StreamCommand>(&text) {
                            Ok(command) => {
                                log::debug!(
                                    "[StreamWs] Command for zone {}: {command:?}",
                                    command.zone_id()
                                );
                                // One command at a time; the next frame is
                                // not read until this one has been applied.
                                if let Err(e) = state.translator.handle_command(command).await {
                                    log::warn!("[StreamWs] Command failed: {e}");
                                }
                            }
                            Err(e) => {
                                log::warn!("[StreamWs] Unparseable host frame: {e}");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if sender.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            // Forward outbound messages from the services
            result = outbound.recv() => {
                match result {
                    Ok(message) => match serde_json::to_string(&message) {
                        Ok(json) => {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => log::warn!("[StreamWs] Failed to serialize message: {e}"),
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!(
                            "[StreamWs] Host receiver lagged; {skipped} message(s) dropped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    log::info!("[StreamWs] Streaming host disconnected: {}", conn_guard.id());
}
