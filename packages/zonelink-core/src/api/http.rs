//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to services for business logic.

use std::net::SocketAddr;

use axum::{
    extract::{connect_info::ConnectInfo, State},
    http::{header, Method},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::api::control_ws::control_ws_handler;
use crate::api::stream_ws::stream_ws_handler;
use crate::api::AppState;
use crate::control::types::Zone;
use crate::protocol_constants::SERVICE_ID;

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    // Browser dashboards may poll the read-only status API from another
    // origin; the sockets and native clients send no Origin header.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/status", get(get_status))
        .route("/api/zones", get(list_zones))
        .route("/icon.png", get(serve_icon))
        .route("/ws/stream", get(stream_ws_handler))
        .route("/ws/control", get(control_ws_handler))
        .layer(cors)
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe: "Is the process running?"
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": SERVICE_ID }))
}

/// Engine status: pairing state plus zone, session, and connection counts.
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(status_body(&state))
}

/// Snapshot of the mirrored zone set, sorted by display name.
async fn list_zones(State(state): State<AppState>) -> impl IntoResponse {
    Json(zones_body(&state))
}

/// Serves the embedded icon shown next to the source name in the control
/// plane's UI.
async fn serve_icon(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    log::debug!(
        "[Server] Icon requested by {} ({} bytes)",
        remote_addr.ip(),
        state.icon.len()
    );
    ([(header::CONTENT_TYPE, "image/png")], state.icon).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Body Builders
// ─────────────────────────────────────────────────────────────────────────────

fn status_body(state: &AppState) -> serde_json::Value {
    let urls = state.network.url_builder();
    json!({
        "service": SERVICE_ID,
        "version": env!("CARGO_PKG_VERSION"),
        "paired": state.gateway.is_connected(),
        "zones": state.registry.len(),
        "sessions": state.sessions.active_sessions(),
        "streamHostConnected": state.stream_connections.connection_count() > 0,
        "uptimeSecs": state.uptime_secs(),
        "endpoints": {
            "stream": urls.stream_socket_url(),
            "control": urls.control_socket_url(),
        },
    })
}

fn zones_body(state: &AppState) -> serde_json::Value {
    let zones: Vec<serde_json::Value> = state.registry.zones().iter().map(zone_summary).collect();
    json!({ "zones": zones })
}

fn zone_summary(zone: &Zone) -> serde_json::Value {
    let volume = zone.volume_output().map(|(output_id, info)| {
        json!({
            "outputId": output_id,
            "value": info.value,
            "isMuted": info.is_muted,
        })
    });
    json!({
        "zoneId": zone.zone_id,
        "displayName": zone.display_name,
        "outputs": zone.outputs.len(),
        "volume": volume,
    })
}
