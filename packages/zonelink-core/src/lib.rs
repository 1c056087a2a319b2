//! Zonelink Core - shared library for Zonelink.
//!
//! This crate provides the core functionality for Zonelink, a bridge that
//! exposes the zones of a multi-zone home audio controller to a connect-style
//! streaming protocol. It is designed to be used by the standalone headless
//! server and by integration harnesses that drive the services directly.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`runtime`]: Task spawning abstraction for async runtime independence
//! - [`messages`]: Wire types for the streaming-host socket and the outbound bridge
//! - [`control`]: Control-plane types and the client abstraction seams
//! - [`context`]: Network configuration and URL building
//! - [`state`]: Application configuration
//! - [`services`]: Zone registry, session manager, slot coordinator, translator
//! - [`gateway`]: Correlated control-plane client over the bridge WebSocket
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The crate defines several traits to decouple core logic from transport
//! implementations:
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`MessageSink`](messages::MessageSink): Emitting host-bound protocol messages
//! - [`ZoneControlClient`](control::traits::ZoneControlClient): Driving the control plane
//! - [`IpDetector`](context::IpDetector): Local IP detection
//!
//! Each trait has a default implementation suitable for the standalone server;
//! tests substitute recording fakes.

// Allow missing docs for now - coverage is uneven across modules
#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod context;
pub mod control;
pub mod error;
pub mod gateway;
pub mod messages;
pub mod metadata;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod state;
pub mod volume;

#[cfg(test)]
mod test_support;

// Re-export commonly used types at the crate root
pub use context::{IpDetector, LocalIpDetector, MediaUrlBuilder, NetworkContext, UrlBuilder};
pub use error::{ZonelinkError, ZonelinkResult};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::Config;

// Re-export control-plane types
pub use control::traits::{AudioInput, ZoneControlClient, ZoneTransport, ZoneVolume};
pub use control::{
    ControlPlaneEvent, Output, SessionEvent, SlotEvent, SlotKind, TransportControls, VolumeInfo,
    Zone, ZoneDiff,
};

// Re-export streaming protocol types
pub use messages::{MessageBridge, MessageSink, StreamCommand, StreamMessage, TrackInfo};
pub use metadata::NowPlayingDisplay;

// Re-export service types
pub use services::{
    ProtocolTranslator, SessionManager, SlotCoordinator, SlotSpec, ZoneRegistry,
};

// Re-export gateway types
pub use gateway::{GatewayFrame, GatewayRequest, GatewayZoneControl, InboundFrame};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices};

// Re-export API types
pub use api::{start_server, AppState, AppStateBuilder, ServerError, WsConnectionManager};

/// Default service icon.
///
/// This image is embedded at compile time and served via the `/icon.png` HTTP
/// endpoint. Session announcements point the streaming host at that endpoint
/// unless `icon_url` in [`Config`] overrides it with an external URL.
pub static DEFAULT_ICON: &[u8] = include_bytes!("../assets/icon.png");
