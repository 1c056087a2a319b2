//! Trait abstractions for control-plane operations.
//!
//! These traits enable dependency injection for testability and modularity.
//! Services depend on traits rather than concrete implementations; the
//! production implementation lives in the gateway module.

use async_trait::async_trait;

use crate::control::types::{
    MuteAction, SessionEvent, SlotEvent, SlotKind, SlotPlayRequest, TransportAction,
    TransportControls,
};
use crate::error::ZonelinkResult;

/// Trait for zone transport control operations.
///
/// Used by `ProtocolTranslator` to drive playback on a zone.
#[async_trait]
pub trait ZoneTransport: Send + Sync {
    /// Seeks the zone to an absolute position.
    ///
    /// # Arguments
    /// * `zone_id` - The zone to seek
    /// * `seconds` - Absolute position in seconds
    async fn seek_absolute(&self, zone_id: &str, seconds: f64) -> ZonelinkResult<()>;

    /// Issues a transport verb (play, pause, stop) against a zone.
    async fn transport(&self, zone_id: &str, action: TransportAction) -> ZonelinkResult<()>;
}

/// Trait for zone output volume and mute operations.
///
/// Used by `ProtocolTranslator` to apply stream-side volume changes to the
/// zone's single volume-capable output.
#[async_trait]
pub trait ZoneVolume: Send + Sync {
    /// Sets the absolute native volume on an output.
    ///
    /// # Arguments
    /// * `output_id` - The output to adjust
    /// * `value` - Absolute value within the output's native range
    async fn set_volume(&self, output_id: &str, value: i32) -> ZonelinkResult<()>;

    /// Mutes or unmutes an output without touching its stored value.
    async fn set_mute(&self, output_id: &str, action: MuteAction) -> ZonelinkResult<()>;
}

/// Trait for the control plane's audio-input service.
///
/// Used by `SessionManager` and `SlotCoordinator`. Session and slot
/// operations are evented: the returned receivers stay open for the lifetime
/// of the session or play request and deliver callbacks as they arrive.
#[async_trait]
pub trait AudioInput: Send + Sync {
    /// Registers this engine as an audio source for a zone.
    ///
    /// The first event on the returned stream is either
    /// [`SessionEvent::Began`] carrying the session handle or
    /// [`SessionEvent::ZoneNotFound`].
    ///
    /// # Arguments
    /// * `zone_id` - The zone to attach to
    /// * `display_name` - Source name shown in the control plane's UI
    /// * `icon_url` - Source icon shown next to the name
    async fn begin_session(
        &self,
        zone_id: &str,
        display_name: &str,
        icon_url: &str,
    ) -> ZonelinkResult<tokio::sync::mpsc::Receiver<SessionEvent>>;

    /// Starts or stages playback of one track in a session slot.
    ///
    /// Events for the request (position reports, state changes, terminal
    /// outcomes) arrive on the returned stream. A request already in flight
    /// for the same slot cannot be cancelled; callers filter superseded
    /// streams themselves.
    async fn play(
        &self,
        request: SlotPlayRequest,
    ) -> ZonelinkResult<tokio::sync::mpsc::Receiver<SlotEvent>>;

    /// Discards the named slots without stopping zone transport.
    async fn clear_slots(&self, session_id: &str, slots: Vec<SlotKind>) -> ZonelinkResult<()>;

    /// Advertises which skip directions the control plane's UI may offer.
    async fn update_transport_controls(
        &self,
        session_id: &str,
        controls: TransportControls,
    ) -> ZonelinkResult<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Combined Traits (for trait objects)
// ─────────────────────────────────────────────────────────────────────────────

/// Combined trait for all control-plane operations.
///
/// Services hold one `Arc<dyn ZoneControlClient>` rather than a trait object
/// per concern.
#[async_trait]
pub trait ZoneControlClient: ZoneTransport + ZoneVolume + AudioInput {}

/// Blanket implementation for any type implementing all traits.
impl<T: ZoneTransport + ZoneVolume + AudioInput> ZoneControlClient for T {}
