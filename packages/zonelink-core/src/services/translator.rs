//! Streaming-protocol command translation.
//!
//! [`ProtocolTranslator`] is the inbound façade: every command the
//! streaming host sends lands here and is mapped onto session, slot, and
//! zone-control operations. Outbound traffic (zone lifecycle, transport
//! state, volume sync) flows through the registry, session manager, and
//! slot coordinator directly.

use std::sync::Arc;

use crate::context::MediaUrlBuilder;
use crate::control::traits::ZoneControlClient;
use crate::control::types::{MuteAction, TransportAction};
use crate::error::{ZonelinkError, ZonelinkResult};
use crate::messages::{StreamCommand, TrackInfo};
use crate::metadata::NowPlayingDisplay;
use crate::services::session_manager::SessionManager;
use crate::services::slot_coordinator::{SlotCoordinator, SlotSpec};
use crate::services::zone_registry::ZoneRegistry;
use crate::volume;

pub struct ProtocolTranslator {
    registry: Arc<ZoneRegistry>,
    sessions: Arc<SessionManager>,
    slots: Arc<SlotCoordinator>,
    client: Arc<dyn ZoneControlClient>,
    media: Option<MediaUrlBuilder>,
    artwork_base_url: Option<String>,
}

impl ProtocolTranslator {
    pub fn new(
        registry: Arc<ZoneRegistry>,
        sessions: Arc<SessionManager>,
        slots: Arc<SlotCoordinator>,
        client: Arc<dyn ZoneControlClient>,
        media: Option<MediaUrlBuilder>,
        artwork_base_url: Option<String>,
    ) -> Self {
        Self {
            registry,
            sessions,
            slots,
            client,
            media,
            artwork_base_url,
        }
    }

    /// Applies one host command.
    ///
    /// Zone-local skips (no session yet, grouped zone, unknown zone) are
    /// logged and succeed; failures that the host should re-issue commands
    /// after surface as errors.
    pub async fn handle_command(&self, command: StreamCommand) -> ZonelinkResult<()> {
        match command {
            StreamCommand::Play {
                zone_id,
                now_playing_info,
                position_ms,
                play_request_id,
                preload_id,
            } => {
                self.handle_play(zone_id, now_playing_info, position_ms, play_request_id, preload_id)
                    .await
            }
            StreamCommand::Preload {
                zone_id,
                now_playing_info,
                preload_id,
            } => self.handle_preload(zone_id, now_playing_info, preload_id).await,
            StreamCommand::Pause { zone_id } => {
                self.client.transport(&zone_id, TransportAction::Pause).await
            }
            StreamCommand::Unpause { zone_id } => {
                self.client.transport(&zone_id, TransportAction::Play).await
            }
            StreamCommand::Stop { zone_id } => {
                self.client.transport(&zone_id, TransportAction::Stop).await
            }
            StreamCommand::Seek {
                zone_id,
                seek_position_ms,
            } => {
                // The control plane takes absolute positions in seconds.
                self.client
                    .seek_absolute(&zone_id, seek_position_ms as f64 / 1000.0)
                    .await
            }
            StreamCommand::Clear { zone_id, slots } => {
                let session_id = self.sessions.get_or_create(&zone_id).await?;
                self.client.clear_slots(&session_id, slots).await
            }
            StreamCommand::VolumeSet { zone_id, volume } => {
                // Dropped, not queued; the host keeps sending absolute
                // levels.
                match self.handle_volume_set(&zone_id, volume).await {
                    Err(err @ (ZonelinkError::SessionNotEstablished { .. }
                    | ZonelinkError::ZoneNotFound { .. }
                    | ZonelinkError::UnsupportedGroupedZone { .. })) => {
                        log::info!("[ProtocolTranslator] Dropping volume command: {err}");
                        Ok(())
                    }
                    outcome => outcome,
                }
            }
        }
    }

    async fn handle_play(
        &self,
        zone_id: String,
        info: TrackInfo,
        position_ms: u64,
        play_request_id: String,
        preload_id: Option<String>,
    ) -> ZonelinkResult<()> {
        // A play confirming the staged track needs no session call and no
        // new request.
        if self.slots.promote_queue(&zone_id, preload_id.as_deref()) {
            return Ok(());
        }

        log::info!("[ProtocolTranslator] Play on zone {zone_id}: {}", info.track_id);
        let media_url = self.media_url(&zone_id, &info.track_id)?;
        let session_id = self.sessions.get_or_create(&zone_id).await?;
        let spec = SlotSpec {
            track_id: info.track_id.clone(),
            media_url,
            seek_position_ms: position_ms,
            preload_id,
            play_request_id: Some(play_request_id),
            info: NowPlayingDisplay::from_track(&info, self.artwork_base_url.as_deref()),
        };
        self.slots.play(&zone_id, &session_id, spec).await
    }

    async fn handle_preload(
        &self,
        zone_id: String,
        info: TrackInfo,
        preload_id: String,
    ) -> ZonelinkResult<()> {
        log::info!(
            "[ProtocolTranslator] Preload on zone {zone_id}: {} ({preload_id})",
            info.track_id
        );
        let media_url = self.media_url(&zone_id, &info.track_id)?;
        let session_id = self.sessions.get_or_create(&zone_id).await?;
        let spec = SlotSpec {
            track_id: info.track_id.clone(),
            media_url,
            // Staged tracks always start from the top.
            seek_position_ms: 0,
            preload_id: Some(preload_id),
            play_request_id: None,
            info: NowPlayingDisplay::from_track(&info, self.artwork_base_url.as_deref()),
        };
        self.slots.preload(&zone_id, &session_id, spec).await
    }

    /// Applies an absolute volume. Zones that cannot take one right now
    /// surface as typed errors; [`Self::handle_command`] turns those into
    /// logged drops.
    async fn handle_volume_set(&self, zone_id: &str, volume: u16) -> ZonelinkResult<()> {
        if self.sessions.get_cached(zone_id).is_none() {
            return Err(ZonelinkError::SessionNotEstablished {
                zone_id: zone_id.to_string(),
            });
        }
        let Some(zone) = self.registry.get(zone_id) else {
            return Err(ZonelinkError::ZoneNotFound {
                zone_id: zone_id.to_string(),
            });
        };
        let Some((output_id, info)) = zone.volume_output() else {
            return Err(ZonelinkError::UnsupportedGroupedZone {
                zone_id: zone_id.to_string(),
            });
        };

        // Un-mute first when the command implies audible volume; volume 0
        // adjusts the level without toggling mute.
        if info.is_muted && volume > 0 {
            self.client.set_mute(output_id, MuteAction::Unmute).await?;
        }
        let native = volume::stream_to_native(info, volume);
        self.client.set_volume(output_id, native).await
    }

    fn media_url(&self, zone_id: &str, track_id: &str) -> ZonelinkResult<String> {
        match &self.media {
            Some(media) => Ok(media.media_url(zone_id, track_id)),
            None => Err(ZonelinkError::Configuration(
                "media_base_url is not configured".into(),
            )),
        }
    }
}
