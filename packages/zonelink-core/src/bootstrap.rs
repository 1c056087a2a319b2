//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together. This pattern provides:
//!
//! - **Clarity**: All dependency relationships are visible in one place
//! - **Testability**: Easy to swap implementations for testing
//! - **Maintainability**: Service creation logic is isolated from usage

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::AppState;
use crate::context::{MediaUrlBuilder, NetworkContext};
use crate::control::traits::ZoneControlClient;
use crate::error::{ZonelinkError, ZonelinkResult};
use crate::gateway::GatewayZoneControl;
use crate::messages::{MessageBridge, MessageSink};
use crate::runtime::TokioSpawner;
use crate::services::{ProtocolTranslator, SessionManager, SlotCoordinator, ZoneRegistry};
use crate::state::Config;

/// Container for all bootstrapped services.
///
/// This struct holds all the wired services created during bootstrap.
/// It's consumed by `AppState` to build the final application state.
#[derive(Clone)]
pub struct BootstrappedServices {
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
    /// Task spawner for event pumps.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Builds the API-layer state over these services.
    pub fn app_state(&self) -> AppState {
        AppState::builder()
            .registry(Arc::clone(&self.registry))
            .sessions(Arc::clone(&self.sessions))
            .slots(Arc::clone(&self.slots))
            .translator(Arc::clone(&self.translator))
            .gateway(Arc::clone(&self.gateway))
            .bridge(self.bridge.clone())
            .network(self.network.clone())
            .config(Arc::clone(&self.config))
            .build()
    }

    /// Initiates graceful shutdown of all services.
    ///
    /// Signals every background task and drops pairing-derived state, the
    /// same teardown an unpair performs.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");
        self.cancel_token.cancel();

        self.sessions.clear_all();
        self.slots.clear_all();
        self.registry.clear();

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps all application services with their dependencies.
///
/// This is the composition root where all services are instantiated and
/// wired together. The wiring order matters - services are created in
/// dependency order:
///
/// 1. Shared infrastructure (message bridge, gateway, cancellation token)
/// 2. Zone registry (depends on the bridge)
/// 3. Session manager (depends on gateway, registry, bridge, network)
/// 4. Slot coordinator (depends on gateway, bridge)
/// 5. Protocol translator (depends on everything above)
///
/// # Errors
///
/// Returns an error when the configuration fails validation.
pub fn bootstrap_services(
    config: Arc<Config>,
    network: NetworkContext,
) -> ZonelinkResult<BootstrappedServices> {
    config.validate().map_err(ZonelinkError::Configuration)?;

    // Create task spawner from current runtime
    let spawner = TokioSpawner::current();

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Outbound messages fan out to the streaming-host socket through the bridge
    let bridge = MessageBridge::new(config.message_channel_capacity);
    let sink: Arc<dyn MessageSink> = Arc::new(bridge.clone());

    // The gateway is the only ZoneControlClient implementation in server mode
    let gateway = Arc::new(GatewayZoneControl::with_event_capacity(
        config.control_event_channel_capacity,
    ));
    let client: Arc<dyn ZoneControlClient> = Arc::clone(&gateway) as Arc<dyn ZoneControlClient>;

    let registry = Arc::new(ZoneRegistry::new(Arc::clone(&sink)));

    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&client),
        Arc::clone(&registry),
        Arc::clone(&sink),
        cancel_token.clone(),
        spawner.clone(),
        network.clone(),
        config.session_name.clone(),
        config.icon_url.clone(),
    ));

    let slots = Arc::new(SlotCoordinator::new(
        Arc::clone(&client),
        Arc::clone(&sink),
        cancel_token.clone(),
        spawner.clone(),
    ));

    let translator = Arc::new(ProtocolTranslator::new(
        Arc::clone(&registry),
        Arc::clone(&sessions),
        Arc::clone(&slots),
        Arc::clone(&client),
        config.media_base_url.as_deref().map(MediaUrlBuilder::new),
        config.artwork_base_url.clone(),
    ));

    Ok(BootstrappedServices {
        registry,
        sessions,
        slots,
        translator,
        gateway,
        bridge,
        network,
        config,
        spawner,
        cancel_token,
    })
}
