//! Control-bridge WebSocket endpoint.
//!
//! The bridge process connects here once and stays connected while paired.
//! Outbound traffic is the gateway's request frames; inbound frames are
//! either correlation frames for the gateway or zone lifecycle events for
//! the registry. Losing this socket is treated as losing the pairing.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::StreamExt;

use crate::api::AppState;
use crate::control::types::ControlPlaneEvent;
use crate::gateway::InboundFrame;

/// WebSocket upgrade handler for `/ws/control`.
pub async fn control_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_control_ws(socket, state))
}

async fn handle_control_ws(socket: WebSocket, state: AppState) {
    let displaced = state.control_connections.close_all();
    if displaced > 0 {
        log::info!("[ControlWs] New bridge connection displaces the previous one");
    }
    let conn_guard = state.control_connections.register();
    let cancel_token = conn_guard.cancel_token().clone();
    let (generation, mut outbound) = state.gateway.connect();
    log::info!("[ControlWs] Control bridge connected: {}", conn_guard.id());

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                log::info!("[ControlWs] Connection force-closed: {}", conn_guard.id());
                break;
            }
            // Drain the gateway's outbound request frames
            request = outbound.recv() => {
                match request {
                    Some(request) => match serde_json::to_string(&request) {
                        Ok(json) => {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => log::warn!("[ControlWs] Failed to serialize request: {e}"),
                    },
                    // The gateway replaced this connection's channel.
                    None => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<InboundFrame>(&text) {
                            Ok(InboundFrame::Gateway(frame)) => {
                                state.gateway.handle_frame(frame).await;
                            }
                            Ok(InboundFrame::Control(event)) => {
                                dispatch_control_event(&state, event);
                            }
                            Err(e) => {
                                log::warn!("[ControlWs] Unparseable bridge frame: {e}");
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
        }
    }

    // If this connection was still the live bridge, everything derived from
    // it (sessions, slots, zone mirror) is now unreachable state.
    if state.gateway.disconnect(generation) {
        state.reset_pairing("control bridge disconnected");
    }
    log::info!("[ControlWs] Control bridge handler finished: {}", conn_guard.id());
}

/// Applies one zone lifecycle event from the control plane.
fn dispatch_control_event(state: &AppState, event: ControlPlaneEvent) {
    match event {
        ControlPlaneEvent::Subscribed { zones } => state.registry.apply_initial(zones),
        ControlPlaneEvent::ZonesUpdated { diff } => state.registry.apply_diff(diff),
        ControlPlaneEvent::Unpaired => state.reset_pairing("controller unpaired"),
    }
}
