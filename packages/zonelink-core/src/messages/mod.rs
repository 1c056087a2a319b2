//! Wire vocabulary exchanged with the streaming host.
//!
//! Both directions are closed tagged enums so the boundary gets exhaustive
//! matching: [`StreamCommand`] for inbound host commands, [`StreamMessage`]
//! for outbound zone/transport messages. JSON framing uses an external
//! `type` tag with the variant name verbatim and snake_case payload fields,
//! matching the host protocol.

mod sink;

pub use sink::{LoggingMessageSink, MessageBridge, MessageSink, NoopMessageSink};

use serde::{Deserialize, Serialize};

use crate::control::types::SlotKind;

/// Track description supplied by the streaming host with play/preload
/// commands.
///
/// `covers` entries are either absolute image URLs or bare image ids the
/// host's artwork CDN resolves; see [`crate::metadata`] for how they become
/// display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub track_id: String,
    /// Absent on malformed host payloads; display falls back to "Unknown".
    pub name: Option<String>,
    pub album_name: Option<String>,
    pub artists: Option<Vec<String>>,
    pub covers: Option<Vec<String>>,
    pub show_name: Option<String>,
}

/// Commands delivered by the streaming host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum StreamCommand {
    /// Start (or confirm, when a matching preloaded slot has begun playing)
    /// audible playback of a track on a zone.
    Play {
        zone_id: String,
        now_playing_info: TrackInfo,
        /// Start offset within the track.
        position_ms: u64,
        /// The host's own correlation id for this request.
        play_request_id: String,
        /// Present when this play confirms an earlier preload.
        #[serde(default)]
        preload_id: Option<String>,
    },
    Pause {
        zone_id: String,
    },
    Unpause {
        zone_id: String,
    },
    Seek {
        zone_id: String,
        seek_position_ms: u64,
    },
    /// Stage the next track in the queue slot for a gapless transition.
    Preload {
        zone_id: String,
        now_playing_info: TrackInfo,
        preload_id: String,
    },
    /// Drop the named slots on the audio-input side.
    Clear {
        zone_id: String,
        slots: Vec<SlotKind>,
    },
    /// Absolute volume in the streaming domain (0..=65535; 0 is muted).
    VolumeSet {
        zone_id: String,
        volume: u16,
    },
    Stop {
        zone_id: String,
    },
}

impl StreamCommand {
    /// The zone the command targets.
    #[must_use]
    pub fn zone_id(&self) -> &str {
        match self {
            Self::Play { zone_id, .. }
            | Self::Pause { zone_id }
            | Self::Unpause { zone_id }
            | Self::Seek { zone_id, .. }
            | Self::Preload { zone_id, .. }
            | Self::Clear { zone_id, .. }
            | Self::VolumeSet { zone_id, .. }
            | Self::Stop { zone_id } => zone_id,
        }
    }
}

/// Messages sent to the streaming host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum StreamMessage {
    /// A zone became available as a streaming target.
    EnableZone { id: String, name: String },
    /// A zone disappeared from the control plane.
    DisableZone { id: String },
    /// A zone's display name changed.
    RenameZone { id: String, name: String },
    /// A zone's volume changed, mapped into the streaming domain
    /// (0..=65535; 0 when muted).
    Volume { id: String, volume: u16 },
    /// The control plane advanced to the next (preloaded) track.
    OnToNext { id: String },
    /// Playback position report for the zone's current track.
    Time {
        id: String,
        seek_position_ms: u64,
        track_id: String,
    },
    Playing { id: String },
    Paused { id: String },
    Unpaused { id: String },
    Stopped { id: String },
    /// The user asked the control plane to skip forward.
    NextTrack { id: String },
    /// The user asked the control plane to skip back.
    PreviousTrack { id: String },
}
