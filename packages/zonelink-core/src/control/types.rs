//! Control-plane domain types.
//!
//! These types represent zones as the control plane advertises them, the
//! session and slot event streams delivered by the audio-input service, and
//! the request records the engine sends back. They are used for state
//! management, the gateway frame protocol, and API responses.

use serde::{Deserialize, Serialize};

use crate::metadata::NowPlayingDisplay;

// ─────────────────────────────────────────────────────────────────────────────
// Zones
// ─────────────────────────────────────────────────────────────────────────────

/// Stepped volume control exposed by a zone output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub min: i32,
    pub max: i32,
    /// Increment granularity; a zero step means the output has no usable
    /// volume control.
    pub step: i32,
    /// Current native value, unchanged by mute toggles.
    pub value: i32,
    pub is_muted: bool,
}

/// A single output belonging to a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub output_id: String,
    /// Absent on fixed-volume outputs.
    pub volume: Option<VolumeInfo>,
}

/// An addressable audio endpoint in the control plane.
///
/// Replaced wholesale on every change notification; the registry never
/// mutates a stored record field-by-field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub zone_id: String,
    pub display_name: String,
    pub outputs: Vec<Output>,
}

impl Zone {
    /// Returns the zone's sole output and its volume control, when the zone
    /// supports volume sync.
    ///
    /// A zone qualifies only with exactly one output exposing a stepped
    /// volume control (non-zero step). Grouped zones and fixed-volume
    /// outputs return `None`.
    #[must_use]
    pub fn volume_output(&self) -> Option<(&str, &VolumeInfo)> {
        match self.outputs.as_slice() {
            [output] => match &output.volume {
                Some(info) if info.step != 0 => Some((output.output_id.as_str(), info)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Incremental change to the zone set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDiff {
    /// Zone ids that disappeared.
    #[serde(default)]
    pub removed: Vec<String>,
    /// Newly advertised zones.
    #[serde(default)]
    pub added: Vec<Zone>,
    /// Zones whose record changed (full replacement records).
    #[serde(default)]
    pub changed: Vec<Zone>,
}

/// Zone-list and pairing lifecycle notifications from the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlPlaneEvent {
    /// Initial snapshot after (re)subscription; replaces the full zone set.
    Subscribed { zones: Vec<Zone> },
    /// Incremental diff against the current zone set.
    ZonesUpdated { diff: ZoneDiff },
    /// The upstream controller unpaired; all engine state is torn down.
    Unpaired,
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// Skip request relayed from the control plane's own UI while a session is
/// active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportRequest {
    Next,
    Previous,
}

/// Lifecycle events for an audio-input session.
///
/// The first event after `begin_session` is either `Began` or
/// `ZoneNotFound`; the stream stays open for transport-control requests and
/// loss notifications afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    Began { session_id: String },
    TransportControlRequest { control: TransportRequest },
    ZoneNotFound,
    ZoneLost,
    Ended,
}

/// Transport capabilities granted to the control plane's UI for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportControls {
    pub is_previous_allowed: bool,
    pub is_next_allowed: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Slots
// ─────────────────────────────────────────────────────────────────────────────

/// The two playback roles a zone holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    /// The audible track.
    Play,
    /// The staged (preloaded) successor.
    Queue,
}

/// Play request issued to the audio-input service for one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotPlayRequest {
    pub session_id: String,
    pub track_id: String,
    pub slot: SlotKind,
    /// Locator the control plane dereferences for the audio bytes.
    pub media_url: String,
    pub seek_position_ms: u64,
    pub info: NowPlayingDisplay,
}

/// Events reported for an issued play request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SlotEvent {
    /// The control plane advanced into the staged successor.
    OnToNext,
    /// Periodic position report.
    Time {
        #[serde(default)]
        seek_position_ms: Option<u64>,
    },
    Playing,
    Paused,
    Unpaused,
    /// The track finished on its own.
    EndedNaturally,
    /// The control plane could not fetch or decode the media.
    MediaError,
    /// Playback stopped from the control plane's side.
    StoppedUser,
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport & Volume Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Transport command verbs accepted by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportAction {
    Play,
    Pause,
    Stop,
}

/// Mute command verbs accepted by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuteAction {
    Mute,
    Unmute,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stepped(value: i32, is_muted: bool) -> VolumeInfo {
        VolumeInfo {
            min: 0,
            max: 100,
            step: 1,
            value,
            is_muted,
        }
    }

    #[test]
    fn single_stepped_output_supports_volume() {
        let zone = Zone {
            zone_id: "z1".into(),
            display_name: "Kitchen".into(),
            outputs: vec![Output {
                output_id: "o1".into(),
                volume: Some(stepped(50, false)),
            }],
        };
        let (output_id, info) = zone.volume_output().expect("volume-capable");
        assert_eq!(output_id, "o1");
        assert_eq!(info.value, 50);
    }

    #[test]
    fn grouped_and_fixed_zones_do_not_support_volume() {
        let grouped = Zone {
            zone_id: "z1".into(),
            display_name: "Everywhere".into(),
            outputs: vec![
                Output {
                    output_id: "o1".into(),
                    volume: Some(stepped(50, false)),
                },
                Output {
                    output_id: "o2".into(),
                    volume: Some(stepped(30, false)),
                },
            ],
        };
        assert!(grouped.volume_output().is_none());

        let fixed = Zone {
            zone_id: "z2".into(),
            display_name: "Office".into(),
            outputs: vec![Output {
                output_id: "o3".into(),
                volume: None,
            }],
        };
        assert!(fixed.volume_output().is_none());

        let zero_step = Zone {
            zone_id: "z3".into(),
            display_name: "Den".into(),
            outputs: vec![Output {
                output_id: "o4".into(),
                volume: Some(VolumeInfo {
                    min: 0,
                    max: 100,
                    step: 0,
                    value: 10,
                    is_muted: false,
                }),
            }],
        };
        assert!(zero_step.volume_output().is_none());
    }

    #[test]
    fn zone_records_round_trip_through_json() {
        let zone: Zone = serde_json::from_value(json!({
            "zone_id": "16015b",
            "display_name": "Kitchen",
            "outputs": [{
                "output_id": "17015b",
                "volume": {"min": 0, "max": 100, "step": 1, "value": 40, "is_muted": true}
            }]
        }))
        .unwrap();
        assert_eq!(zone.display_name, "Kitchen");
        assert!(zone.volume_output().unwrap().1.is_muted);
    }

    #[test]
    fn diff_fields_default_to_empty() {
        let event: ControlPlaneEvent = serde_json::from_value(json!({
            "type": "ZonesUpdated",
            "diff": {"removed": ["z9"]}
        }))
        .unwrap();
        match event {
            ControlPlaneEvent::ZonesUpdated { diff } => {
                assert_eq!(diff.removed, vec!["z9".to_string()]);
                assert!(diff.added.is_empty());
                assert!(diff.changed.is_empty());
            }
            other => panic!("parsed wrong variant: {other:?}"),
        }
    }
}
