//! HTTP/WebSocket API layer.
//!
//! This module contains thin handlers that delegate to services.
//! It provides the router construction and server startup functionality.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::context::NetworkContext;
use crate::gateway::GatewayZoneControl;
use crate::messages::MessageBridge;
use crate::protocol_constants::{PORT_SCAN_END, PORT_SCAN_START};
use crate::services::{ProtocolTranslator, SessionManager, SlotCoordinator, ZoneRegistry};
use crate::state::Config;

pub mod control_ws;
pub mod http;
pub mod stream_ws;
pub mod ws_connection;

pub use ws_connection::WsConnectionManager;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services.
/// All business logic lives in the services themselves.
#[derive(Clone)]
pub struct AppState {
    /// Mirror of the control plane's zone set.
    pub registry: Arc<ZoneRegistry>,
    /// Zone session lifecycle and caching.
    pub sessions: Arc<SessionManager>,
    /// Play/queue slot state per zone.
    pub slots: Arc<SlotCoordinator>,
    /// Inbound streaming-host command dispatch.
    pub translator: Arc<ProtocolTranslator>,
    /// Correlated client over the control-bridge socket.
    pub gateway: Arc<GatewayZoneControl>,
    /// Broadcast bridge feeding the streaming-host socket.
    pub bridge: MessageBridge,
    /// Network configuration (port, local IP).
    pub network: NetworkContext,
    /// Application configuration.
    pub config: Arc<Config>,
    /// Embedded icon served at /icon.png and announced to the control plane.
    pub icon: &'static [u8],
    /// Streaming-host socket connections (at most one live).
    pub stream_connections: Arc<WsConnectionManager>,
    /// Control-bridge socket connections (at most one live).
    pub control_connections: Arc<WsConnectionManager>,
    started_at: Instant,
}

/// Builder for constructing an `AppState`.
#[derive(Default)]
pub struct AppStateBuilder {
    registry: Option<Arc<ZoneRegistry>>,
    sessions: Option<Arc<SessionManager>>,
    slots: Option<Arc<SlotCoordinator>>,
    translator: Option<Arc<ProtocolTranslator>>,
    gateway: Option<Arc<GatewayZoneControl>>,
    bridge: Option<MessageBridge>,
    network: Option<NetworkContext>,
    config: Option<Arc<Config>>,
    icon: Option<&'static [u8]>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(mut self, registry: Arc<ZoneRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn sessions(mut self, sessions: Arc<SessionManager>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn slots(mut self, slots: Arc<SlotCoordinator>) -> Self {
        self.slots = Some(slots);
        self
    }

    pub fn translator(mut self, translator: Arc<ProtocolTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn gateway(mut self, gateway: Arc<GatewayZoneControl>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn bridge(mut self, bridge: MessageBridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn network(mut self, network: NetworkContext) -> Self {
        self.network = Some(network);
        self
    }

    pub fn config(mut self, config: Arc<Config>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn icon(mut self, icon: &'static [u8]) -> Self {
        self.icon = Some(icon);
        self
    }

    /// Builds the `AppState`, panicking if required fields are missing.
    pub fn build(self) -> AppState {
        AppState {
            registry: self.registry.expect("registry is required"),
            sessions: self.sessions.expect("sessions is required"),
            slots: self.slots.expect("slots is required"),
            translator: self.translator.expect("translator is required"),
            gateway: self.gateway.expect("gateway is required"),
            bridge: self.bridge.expect("bridge is required"),
            network: self.network.expect("network is required"),
            config: self.config.expect("config is required"),
            icon: self.icon.unwrap_or(crate::DEFAULT_ICON),
            stream_connections: Arc::new(WsConnectionManager::new("stream")),
            control_connections: Arc::new(WsConnectionManager::new("control")),
            started_at: Instant::now(),
        }
    }
}

impl AppState {
    /// Creates a new builder for constructing an `AppState`.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Seconds since this state was built.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Tears down every piece of pairing-derived state.
    ///
    /// Runs when the control plane reports `Unpaired` and when the control
    /// bridge disconnects. Sessions, slots, and the zone mirror are cleared
    /// without emitting per-zone messages; the streaming host is force-closed
    /// instead and resynchronizes from scratch on reconnect.
    pub fn reset_pairing(&self, reason: &str) {
        log::info!(
            "[Bootstrap] Resetting pairing state ({reason}): {} session(s), {} zone(s)",
            self.sessions.active_sessions(),
            self.registry.len()
        );
        self.sessions.clear_all();
        self.slots.clear_all();
        self.registry.clear();
        self.stream_connections.close_all();
    }
}

async fn find_available_port(
    start: u16,
    end: u16,
) -> Result<(u16, tokio::net::TcpListener), ServerError> {
    for port in start..=end {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

/// Starts the HTTP server on the configured or auto-discovered port.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let preferred_port = state.config.preferred_port;
    let (port, listener) = if preferred_port > 0 {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], preferred_port));
        (preferred_port, tokio::net::TcpListener::bind(&addr).await?)
    } else {
        find_available_port(PORT_SCAN_START, PORT_SCAN_END).await?
    };

    // Record the bound port so announced URLs carry it
    state.network.set_port(port);

    log::info!("[Server] Listening on http://0.0.0.0:{}", port);
    log::info!(
        "[Server] Advertised base URL: {}",
        state.network.url_builder().base_url()
    );
    let app = http::create_router(state);

    // Use into_make_service_with_connect_info to enable ConnectInfo<SocketAddr> extraction
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}
