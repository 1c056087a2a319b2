//! Zone registry service.
//!
//! Responsibilities:
//! - Holding the last-known record of every zone the control plane
//!   advertises
//! - Applying snapshot and diff notifications
//! - Emitting enable/disable/rename/volume messages to the streaming host
//!
//! The registry only notifies outward; it never calls into the session or
//! slot layers.

use std::sync::Arc;

use dashmap::DashMap;

use crate::control::types::{Zone, ZoneDiff};
use crate::messages::{MessageSink, StreamMessage};
use crate::volume;

/// Last-known zone state, keyed by zone id.
pub struct ZoneRegistry {
    zones: DashMap<String, Zone>,
    sink: Arc<dyn MessageSink>,
}

impl ZoneRegistry {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            zones: DashMap::new(),
            sink,
        }
    }

    /// Replaces the full zone set from a subscription snapshot and enables
    /// every zone on the streaming side.
    pub fn apply_initial(&self, zones: Vec<Zone>) {
        self.zones.clear();
        log::info!("[ZoneRegistry] Subscribed with {} zone(s)", zones.len());
        for zone in zones {
            self.sink.send(StreamMessage::EnableZone {
                id: zone.zone_id.clone(),
                name: zone.display_name.clone(),
            });
            self.zones.insert(zone.zone_id.clone(), zone);
        }
    }

    /// Applies an incremental change notification.
    ///
    /// Removals are processed before additions so a zone id moving between
    /// lists settles on the added record.
    pub fn apply_diff(&self, diff: ZoneDiff) {
        for zone_id in diff.removed {
            self.zones.remove(&zone_id);
            self.sink.send(StreamMessage::DisableZone { id: zone_id });
        }
        for zone in diff.added {
            self.sink.send(StreamMessage::EnableZone {
                id: zone.zone_id.clone(),
                name: zone.display_name.clone(),
            });
            self.zones.insert(zone.zone_id.clone(), zone);
        }
        for zone in diff.changed {
            self.apply_changed(zone);
        }
    }

    /// Compares a changed zone against the stored record, emits the
    /// resulting messages, and stores the new record.
    fn apply_changed(&self, zone: Zone) {
        let Some(old) = self.get(&zone.zone_id) else {
            // Missed the add; heal the stream side with an enable.
            log::debug!(
                "[ZoneRegistry] Change for unknown zone {}, treating as added",
                zone.zone_id
            );
            self.sink.send(StreamMessage::EnableZone {
                id: zone.zone_id.clone(),
                name: zone.display_name.clone(),
            });
            self.zones.insert(zone.zone_id.clone(), zone);
            return;
        };

        if old.display_name != zone.display_name {
            log::info!(
                "[ZoneRegistry] Zone {} renamed to {}",
                zone.zone_id,
                zone.display_name
            );
            self.sink.send(StreamMessage::RenameZone {
                id: zone.zone_id.clone(),
                name: zone.display_name.clone(),
            });
        }

        match (old.volume_output(), zone.volume_output()) {
            (Some((_, old_info)), Some((_, new_info))) => {
                // Mute transitions outrank value changes: one message per
                // change notification.
                if old_info.is_muted != new_info.is_muted {
                    let stream = if new_info.is_muted {
                        0
                    } else {
                        volume::native_to_stream(new_info)
                    };
                    self.sink.send(StreamMessage::Volume {
                        id: zone.zone_id.clone(),
                        volume: stream,
                    });
                } else if old_info.value != new_info.value {
                    self.sink.send(StreamMessage::Volume {
                        id: zone.zone_id.clone(),
                        volume: volume::native_to_stream(new_info),
                    });
                }
            }
            _ => {
                log::debug!(
                    "[ZoneRegistry] Grouped zone volume not supported: {}",
                    zone.zone_id
                );
            }
        }

        self.zones.insert(zone.zone_id.clone(), zone);
    }

    /// Returns a copy of the stored record for a zone.
    #[must_use]
    pub fn get(&self, zone_id: &str) -> Option<Zone> {
        self.zones.get(zone_id).map(|zone| zone.clone())
    }

    /// Returns all known zones, sorted by display name for stable listings.
    #[must_use]
    pub fn zones(&self) -> Vec<Zone> {
        let mut zones: Vec<Zone> = self.zones.iter().map(|entry| entry.clone()).collect();
        zones.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        zones
    }

    /// Number of known zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Forgets every zone without emitting messages. Used on unpair, where
    /// the streaming host is torn down along with the state.
    pub fn clear(&self) {
        self.zones.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{grouped_zone, stepped_zone, RecordingMessageSink};

    fn registry_with_sink() -> (ZoneRegistry, Arc<RecordingMessageSink>) {
        let sink = RecordingMessageSink::new();
        let registry = ZoneRegistry::new(sink.clone());
        (registry, sink)
    }

    fn changed(zone: Zone) -> ZoneDiff {
        ZoneDiff {
            changed: vec![zone],
            ..ZoneDiff::default()
        }
    }

    #[test]
    fn initial_snapshot_enables_every_zone() {
        let (registry, sink) = registry_with_sink();
        registry.apply_initial(vec![
            stepped_zone("z1", "Kitchen", 50, false),
            stepped_zone("z2", "Office", 30, false),
        ]);

        let messages = sink.take();
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0],
            StreamMessage::EnableZone {
                id: "z1".into(),
                name: "Kitchen".into()
            }
        );
        assert!(registry.get("z2").is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn removed_zones_disable_and_added_zones_enable() {
        let (registry, sink) = registry_with_sink();
        registry.apply_initial(vec![stepped_zone("z1", "Kitchen", 50, false)]);
        sink.take();

        registry.apply_diff(ZoneDiff {
            removed: vec!["z1".into()],
            added: vec![stepped_zone("z2", "Office", 30, false)],
            changed: vec![],
        });

        assert_eq!(
            sink.take(),
            vec![
                StreamMessage::DisableZone { id: "z1".into() },
                StreamMessage::EnableZone {
                    id: "z2".into(),
                    name: "Office".into()
                },
            ]
        );
        assert!(registry.get("z1").is_none());
        assert!(registry.get("z2").is_some());
    }

    #[test]
    fn rename_emits_rename_message() {
        let (registry, sink) = registry_with_sink();
        registry.apply_initial(vec![stepped_zone("z1", "Kitchen", 50, false)]);
        sink.take();

        registry.apply_diff(changed(stepped_zone("z1", "Kitchen Speakers", 50, false)));

        assert_eq!(
            sink.take(),
            vec![StreamMessage::RenameZone {
                id: "z1".into(),
                name: "Kitchen Speakers".into()
            }]
        );
        assert_eq!(registry.get("z1").unwrap().display_name, "Kitchen Speakers");
    }

    #[test]
    fn unmuting_emits_mapped_current_value() {
        let (registry, sink) = registry_with_sink();
        registry.apply_initial(vec![stepped_zone("z1", "Kitchen", 40, true)]);
        sink.take();

        registry.apply_diff(changed(stepped_zone("z1", "Kitchen", 40, false)));

        assert_eq!(
            sink.take(),
            vec![StreamMessage::Volume {
                id: "z1".into(),
                volume: 26214
            }]
        );
    }

    #[test]
    fn muting_emits_zero() {
        let (registry, sink) = registry_with_sink();
        registry.apply_initial(vec![stepped_zone("z1", "Kitchen", 40, false)]);
        sink.take();

        registry.apply_diff(changed(stepped_zone("z1", "Kitchen", 40, true)));

        assert_eq!(
            sink.take(),
            vec![StreamMessage::Volume {
                id: "z1".into(),
                volume: 0
            }]
        );
    }

    #[test]
    fn mute_transition_outranks_simultaneous_value_change() {
        let (registry, sink) = registry_with_sink();
        registry.apply_initial(vec![stepped_zone("z1", "Kitchen", 40, false)]);
        sink.take();

        // Both the mute flag and the value change in one notification.
        registry.apply_diff(changed(stepped_zone("z1", "Kitchen", 70, true)));

        assert_eq!(
            sink.take(),
            vec![StreamMessage::Volume {
                id: "z1".into(),
                volume: 0
            }]
        );
        // The stored record still took the new value.
        assert_eq!(
            registry.get("z1").unwrap().volume_output().unwrap().1.value,
            70
        );
    }

    #[test]
    fn value_change_emits_mapped_volume() {
        let (registry, sink) = registry_with_sink();
        registry.apply_initial(vec![stepped_zone("z1", "Kitchen", 40, false)]);
        sink.take();

        registry.apply_diff(changed(stepped_zone("z1", "Kitchen", 50, false)));

        assert_eq!(
            sink.take(),
            vec![StreamMessage::Volume {
                id: "z1".into(),
                volume: 32768
            }]
        );
    }

    #[test]
    fn grouped_zones_emit_no_volume_messages() {
        let (registry, sink) = registry_with_sink();
        registry.apply_initial(vec![grouped_zone("z1", "Everywhere")]);
        sink.take();

        let mut regrouped = grouped_zone("z1", "Everywhere");
        regrouped.outputs[0].volume.as_mut().unwrap().value = 80;
        registry.apply_diff(changed(regrouped.clone()));

        assert!(sink.take().is_empty());
        assert_eq!(registry.get("z1").unwrap(), regrouped);
    }

    #[test]
    fn change_for_unknown_zone_is_treated_as_added() {
        let (registry, sink) = registry_with_sink();
        registry.apply_diff(changed(stepped_zone("z9", "Den", 10, false)));

        assert_eq!(
            sink.take(),
            vec![StreamMessage::EnableZone {
                id: "z9".into(),
                name: "Den".into()
            }]
        );
        assert!(registry.get("z9").is_some());
    }

    #[test]
    fn clear_forgets_zones_silently() {
        let (registry, sink) = registry_with_sink();
        registry.apply_initial(vec![stepped_zone("z1", "Kitchen", 50, false)]);
        sink.take();

        registry.clear();
        assert!(registry.is_empty());
        assert!(sink.take().is_empty());
    }
}
