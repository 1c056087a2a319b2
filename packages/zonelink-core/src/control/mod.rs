//! Control-plane integration: domain types and the trait seams services
//! depend on.

pub mod traits;
pub mod types;

pub use traits::{AudioInput, ZoneControlClient, ZoneTransport, ZoneVolume};
pub use types::{
    ControlPlaneEvent, MuteAction, Output, SessionEvent, SlotEvent, SlotKind, SlotPlayRequest,
    TransportAction, TransportControls, TransportRequest, VolumeInfo, Zone, ZoneDiff,
};
