//! Engine services layer.
//!
//! This module contains the coordination logic that bridges the control
//! plane (zones, sessions, slots) and the streaming host protocol.

pub mod session_manager;
pub mod slot_coordinator;
pub mod translator;
pub mod zone_registry;

pub use session_manager::SessionManager;
pub use slot_coordinator::{SlotCoordinator, SlotSpec};
pub use translator::ProtocolTranslator;
pub use zone_registry::ZoneRegistry;
