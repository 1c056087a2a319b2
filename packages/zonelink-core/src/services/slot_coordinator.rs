//! Per-zone playback slot state machine.
//!
//! Each zone holds at most one `play` slot (the audible track) and one
//! `queue` slot (the staged successor). Every issued request gets a
//! process-unique creation id; callbacks are honored only while their id
//! still matches the slot occupying that role. A superseded request's
//! callbacks are discarded, which stands in for cancellation: the underlying
//! native requests cannot be cancelled once issued.
//!
//! Queue slots are promoted to the play role when the host's next play
//! command confirms the staged track became audible (matching correlation
//! token, queue already reported `Playing`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::control::traits::ZoneControlClient;
use crate::control::types::{SlotEvent, SlotKind, SlotPlayRequest};
use crate::error::ZonelinkResult;
use crate::messages::{MessageSink, StreamMessage};
use crate::metadata::NowPlayingDisplay;
use crate::runtime::{TaskSpawner, TokioSpawner};

/// Inputs for installing one slot.
#[derive(Debug, Clone)]
pub struct SlotSpec {
    pub track_id: String,
    pub media_url: String,
    pub seek_position_ms: u64,
    /// Correlation token from the host's preload, used to match a later
    /// play command to the staged slot.
    pub preload_id: Option<String>,
    /// The host's own request id (play commands only).
    pub play_request_id: Option<String>,
    pub info: NowPlayingDisplay,
}

/// One issued playback request occupying a slot role.
#[derive(Debug)]
struct Slot {
    id: u64,
    track_id: String,
    preload_id: Option<String>,
    /// Set once the control plane reports the staged track audible; only
    /// then may a matching play command promote it.
    has_started_playing: bool,
}

#[derive(Debug, Default)]
struct ZoneSlots {
    play: Option<Slot>,
    queue: Option<Slot>,
}

/// Slot state machine for all zones.
pub struct SlotCoordinator {
    slots: DashMap<String, ZoneSlots>,
    next_slot_id: AtomicU64,
    client: Arc<dyn ZoneControlClient>,
    sink: Arc<dyn MessageSink>,
    cancel: CancellationToken,
    spawner: TokioSpawner,
}

impl SlotCoordinator {
    pub fn new(
        client: Arc<dyn ZoneControlClient>,
        sink: Arc<dyn MessageSink>,
        cancel: CancellationToken,
        spawner: TokioSpawner,
    ) -> Self {
        Self {
            slots: DashMap::new(),
            next_slot_id: AtomicU64::new(0),
            client,
            sink,
            cancel,
            spawner,
        }
    }

    /// Promotes the queue slot to the play role when the host's play
    /// command confirms the staged track.
    ///
    /// Requires a queue slot that has already reported `Playing` and whose
    /// correlation token equals the command's. Promotion keeps the slot's
    /// creation id, so the staged request's future callbacks now drive the
    /// play role; any previous play slot is discarded and its callbacks go
    /// stale. No new native request is issued.
    pub fn promote_queue(&self, zone_id: &str, preload_id: Option<&str>) -> bool {
        let Some(mut zone_slots) = self.slots.get_mut(zone_id) else {
            return false;
        };
        let confirmed = zone_slots
            .queue
            .as_ref()
            .is_some_and(|queue| {
                queue.has_started_playing && queue.preload_id.as_deref() == preload_id
            });
        if confirmed {
            log::info!(
                "[SlotCoordinator] Staged track confirmed audible on {zone_id}, promoting queue slot"
            );
            zone_slots.play = zone_slots.queue.take();
        }
        confirmed
    }

    /// Installs a new play slot and issues its native play request.
    ///
    /// The previous play slot (if any) is replaced, invalidating its future
    /// callbacks.
    pub async fn play(
        self: &Arc<Self>,
        zone_id: &str,
        session_id: &str,
        spec: SlotSpec,
    ) -> ZonelinkResult<()> {
        let slot_id = self.next_slot_id.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "[SlotCoordinator] Play slot {slot_id} on {zone_id}: track {} (host request {:?})",
            spec.track_id,
            spec.play_request_id
        );
        {
            let mut zone_slots = self.slots.entry(zone_id.to_string()).or_default();
            zone_slots.play = Some(Slot {
                id: slot_id,
                track_id: spec.track_id.clone(),
                preload_id: spec.preload_id.clone(),
                has_started_playing: false,
            });
        }

        let events = self.issue(zone_id, session_id, SlotKind::Play, spec).await?;
        self.spawn_slot_pump(zone_id.to_string(), slot_id, events);
        Ok(())
    }

    /// Installs a new queue slot and issues its native play request for the
    /// staged role.
    pub async fn preload(
        self: &Arc<Self>,
        zone_id: &str,
        session_id: &str,
        spec: SlotSpec,
    ) -> ZonelinkResult<()> {
        let slot_id = self.next_slot_id.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "[SlotCoordinator] Queue slot {slot_id} on {zone_id}: track {} (preload {:?})",
            spec.track_id,
            spec.preload_id
        );
        {
            let mut zone_slots = self.slots.entry(zone_id.to_string()).or_default();
            zone_slots.queue = Some(Slot {
                id: slot_id,
                track_id: spec.track_id.clone(),
                preload_id: spec.preload_id.clone(),
                has_started_playing: false,
            });
        }

        let events = self.issue(zone_id, session_id, SlotKind::Queue, spec).await?;
        self.spawn_slot_pump(zone_id.to_string(), slot_id, events);
        Ok(())
    }

    /// Forgets every slot on every zone. Pending callbacks all go stale.
    pub fn clear_all(&self) {
        self.slots.clear();
    }

    async fn issue(
        &self,
        zone_id: &str,
        session_id: &str,
        slot: SlotKind,
        spec: SlotSpec,
    ) -> ZonelinkResult<mpsc::Receiver<SlotEvent>> {
        self.client
            .play(SlotPlayRequest {
                session_id: session_id.to_string(),
                track_id: spec.track_id,
                slot,
                media_url: spec.media_url,
                seek_position_ms: spec.seek_position_ms,
                info: spec.info,
            })
            .await
            .map_err(|err| {
                log::warn!("[SlotCoordinator] Play request failed on {zone_id}: {err}");
                err
            })
    }

    fn spawn_slot_pump(
        self: &Arc<Self>,
        zone_id: String,
        slot_id: u64,
        mut events: mpsc::Receiver<SlotEvent>,
    ) {
        let coordinator = Arc::clone(self);
        self.spawner.spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = coordinator.cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                coordinator.handle_slot_event(&zone_id, slot_id, event);
            }
        });
    }

    /// Routes one callback event by the issuing request's id.
    ///
    /// Events whose id matches neither current slot are discarded without
    /// touching state or emitting messages.
    fn handle_slot_event(&self, zone_id: &str, slot_id: u64, event: SlotEvent) {
        let Some(mut zone_slots) = self.slots.get_mut(zone_id) else {
            log::trace!("[SlotCoordinator] Callback {slot_id} for slotless zone {zone_id}");
            return;
        };

        if zone_slots.play.as_ref().is_some_and(|slot| slot.id == slot_id) {
            self.on_play_slot_event(zone_id, &mut zone_slots, event);
        } else if zone_slots
            .queue
            .as_ref()
            .is_some_and(|slot| slot.id == slot_id)
        {
            self.on_queue_slot_event(zone_id, &mut zone_slots, slot_id, event);
        } else {
            log::trace!("[SlotCoordinator] Stale callback {slot_id} on {zone_id}, discarding");
        }
    }

    fn on_play_slot_event(&self, zone_id: &str, zone_slots: &mut ZoneSlots, event: SlotEvent) {
        let id = zone_id.to_string();
        match event {
            SlotEvent::OnToNext => self.sink.send(StreamMessage::OnToNext { id }),
            SlotEvent::Time { seek_position_ms } => {
                // The play slot is present here; its track id rides along so
                // the host can attribute the position.
                let track_id = zone_slots
                    .play
                    .as_ref()
                    .map(|slot| slot.track_id.clone())
                    .unwrap_or_default();
                self.sink.send(StreamMessage::Time {
                    id,
                    seek_position_ms: seek_position_ms.unwrap_or(0),
                    track_id,
                });
            }
            SlotEvent::Playing => self.sink.send(StreamMessage::Playing { id }),
            SlotEvent::Paused => self.sink.send(StreamMessage::Paused { id }),
            SlotEvent::Unpaused => self.sink.send(StreamMessage::Unpaused { id }),
            SlotEvent::EndedNaturally => {
                if zone_slots.queue.is_some() {
                    // The staged successor takes over; its play command will
                    // promote it.
                    self.sink.send(StreamMessage::OnToNext { id });
                } else {
                    self.sink.send(StreamMessage::Stopped { id });
                }
                zone_slots.play = None;
            }
            SlotEvent::MediaError | SlotEvent::StoppedUser => {
                self.sink.send(StreamMessage::Stopped { id });
                zone_slots.play = None;
            }
        }
    }

    fn on_queue_slot_event(
        &self,
        zone_id: &str,
        zone_slots: &mut ZoneSlots,
        slot_id: u64,
        event: SlotEvent,
    ) {
        match event {
            SlotEvent::Playing => {
                if let Some(queue) = zone_slots.queue.as_mut() {
                    queue.has_started_playing = true;
                }
                self.sink.send(StreamMessage::Playing {
                    id: zone_id.to_string(),
                });
            }
            other => {
                // Not authoritative for the zone until promoted.
                log::debug!(
                    "[SlotCoordinator] Unhandled queue slot event {other:?} ({slot_id} on {zone_id})"
                );
            }
        }
    }

    #[cfg(test)]
    fn play_slot_track(&self, zone_id: &str) -> Option<String> {
        self.slots
            .get(zone_id)
            .and_then(|slots| slots.play.as_ref().map(|slot| slot.track_id.clone()))
    }

    #[cfg(test)]
    fn queue_slot_track(&self, zone_id: &str) -> Option<String> {
        self.slots
            .get(zone_id)
            .and_then(|slots| slots.queue.as_ref().map(|slot| slot.track_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::messages::TrackInfo;
    use crate::test_support::{track_info, MockZoneControl, RecordingMessageSink};

    fn fixture() -> (
        Arc<SlotCoordinator>,
        Arc<MockZoneControl>,
        Arc<RecordingMessageSink>,
    ) {
        let client = MockZoneControl::new();
        let sink = RecordingMessageSink::new();
        let coordinator = Arc::new(SlotCoordinator::new(
            client.clone(),
            sink.clone(),
            CancellationToken::new(),
            TokioSpawner::current(),
        ));
        (coordinator, client, sink)
    }

    fn spec(info: &TrackInfo, preload_id: Option<&str>) -> SlotSpec {
        SlotSpec {
            track_id: info.track_id.clone(),
            media_url: format!("http://10.0.0.5:36697/stream/z1/{}", info.track_id),
            seek_position_ms: 0,
            preload_id: preload_id.map(str::to_string),
            play_request_id: None,
            info: NowPlayingDisplay::from_track(info, None),
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn play_issues_request_and_forwards_playing() {
        let (coordinator, client, sink) = fixture();
        let track = track_info("track:a", "A");

        coordinator
            .play("z1", "session-1", spec(&track, None))
            .await
            .unwrap();

        let requests = client.play_requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].slot, SlotKind::Play);
        assert_eq!(requests[0].session_id, "session-1");
        assert_eq!(
            requests[0].media_url,
            "http://10.0.0.5:36697/stream/z1/track:a"
        );
        drop(requests);

        client.slot_sender(0).send(SlotEvent::Playing).await.unwrap();
        settle().await;

        assert_eq!(
            sink.take(),
            vec![StreamMessage::Playing { id: "z1".into() }]
        );
    }

    #[tokio::test]
    async fn superseded_play_slot_callbacks_are_discarded() {
        let (coordinator, client, sink) = fixture();

        coordinator
            .play("z1", "session-1", spec(&track_info("track:a", "A"), None))
            .await
            .unwrap();
        coordinator
            .play("z1", "session-1", spec(&track_info("track:b", "B"), None))
            .await
            .unwrap();

        // Late event from the first, superseded request.
        client.slot_sender(0).send(SlotEvent::Playing).await.unwrap();
        settle().await;
        assert!(sink.take().is_empty());

        // The current request's events still flow.
        client.slot_sender(1).send(SlotEvent::Playing).await.unwrap();
        settle().await;
        assert_eq!(
            sink.take(),
            vec![StreamMessage::Playing { id: "z1".into() }]
        );
    }

    #[tokio::test]
    async fn time_events_carry_the_play_slot_track_id() {
        let (coordinator, client, sink) = fixture();
        coordinator
            .play("z1", "session-1", spec(&track_info("track:a", "A"), None))
            .await
            .unwrap();

        client
            .slot_sender(0)
            .send(SlotEvent::Time {
                seek_position_ms: Some(42_000),
            })
            .await
            .unwrap();
        client
            .slot_sender(0)
            .send(SlotEvent::Time {
                seek_position_ms: None,
            })
            .await
            .unwrap();
        settle().await;

        assert_eq!(
            sink.take(),
            vec![
                StreamMessage::Time {
                    id: "z1".into(),
                    seek_position_ms: 42_000,
                    track_id: "track:a".into()
                },
                StreamMessage::Time {
                    id: "z1".into(),
                    seek_position_ms: 0,
                    track_id: "track:a".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn queue_playing_marks_staged_and_enables_promotion() {
        let (coordinator, client, sink) = fixture();
        coordinator
            .play("z1", "session-1", spec(&track_info("track:a", "A"), None))
            .await
            .unwrap();
        coordinator
            .preload("z1", "session-1", spec(&track_info("track:b", "B"), Some("pre-1")))
            .await
            .unwrap();

        // Not started yet: promotion refused.
        assert!(!coordinator.promote_queue("z1", Some("pre-1")));

        client.slot_sender(1).send(SlotEvent::Playing).await.unwrap();
        settle().await;
        assert_eq!(
            sink.take(),
            vec![StreamMessage::Playing { id: "z1".into() }]
        );

        // Wrong token: refused. Matching token: promoted without a new
        // native request.
        assert!(!coordinator.promote_queue("z1", Some("pre-9")));
        assert!(coordinator.promote_queue("z1", Some("pre-1")));
        assert_eq!(client.play_calls.load(Ordering::SeqCst), 2);
        assert_eq!(coordinator.play_slot_track("z1").as_deref(), Some("track:b"));
        assert!(coordinator.queue_slot_track("z1").is_none());

        // The staged request's events now drive the play role.
        client.slot_sender(1).send(SlotEvent::OnToNext).await.unwrap();
        settle().await;
        assert_eq!(
            sink.take(),
            vec![StreamMessage::OnToNext { id: "z1".into() }]
        );
    }

    #[tokio::test]
    async fn ended_naturally_with_staged_successor_advances() {
        let (coordinator, client, sink) = fixture();
        coordinator
            .play("z1", "session-1", spec(&track_info("track:a", "A"), None))
            .await
            .unwrap();
        coordinator
            .preload("z1", "session-1", spec(&track_info("track:b", "B"), Some("pre-1")))
            .await
            .unwrap();

        client
            .slot_sender(0)
            .send(SlotEvent::EndedNaturally)
            .await
            .unwrap();
        settle().await;

        assert_eq!(
            sink.take(),
            vec![StreamMessage::OnToNext { id: "z1".into() }]
        );
        assert!(coordinator.play_slot_track("z1").is_none());
        // The staged slot stays put for the upcoming play command.
        assert_eq!(
            coordinator.queue_slot_track("z1").as_deref(),
            Some("track:b")
        );
    }

    #[tokio::test]
    async fn ended_naturally_without_successor_stops() {
        let (coordinator, client, sink) = fixture();
        coordinator
            .play("z1", "session-1", spec(&track_info("track:a", "A"), None))
            .await
            .unwrap();

        client
            .slot_sender(0)
            .send(SlotEvent::EndedNaturally)
            .await
            .unwrap();
        settle().await;

        assert_eq!(
            sink.take(),
            vec![StreamMessage::Stopped { id: "z1".into() }]
        );
        assert!(coordinator.play_slot_track("z1").is_none());
    }

    #[tokio::test]
    async fn media_error_and_user_stop_clear_the_play_slot() {
        let (coordinator, client, sink) = fixture();
        for event in [SlotEvent::MediaError, SlotEvent::StoppedUser] {
            coordinator
                .play("z1", "session-1", spec(&track_info("track:a", "A"), None))
                .await
                .unwrap();
            let index = client.slot_senders.lock().len() - 1;
            client.slot_sender(index).send(event).await.unwrap();
            settle().await;

            assert_eq!(
                sink.take(),
                vec![StreamMessage::Stopped { id: "z1".into() }]
            );
            assert!(coordinator.play_slot_track("z1").is_none());
        }
    }

    #[tokio::test]
    async fn queue_slot_ignores_transport_state_events() {
        let (coordinator, client, sink) = fixture();
        coordinator
            .preload("z1", "session-1", spec(&track_info("track:b", "B"), Some("pre-1")))
            .await
            .unwrap();

        client.slot_sender(0).send(SlotEvent::Paused).await.unwrap();
        client
            .slot_sender(0)
            .send(SlotEvent::EndedNaturally)
            .await
            .unwrap();
        settle().await;

        assert!(sink.take().is_empty());
        assert_eq!(
            coordinator.queue_slot_track("z1").as_deref(),
            Some("track:b")
        );
    }

    #[tokio::test]
    async fn clear_all_makes_every_callback_stale() {
        let (coordinator, client, sink) = fixture();
        coordinator
            .play("z1", "session-1", spec(&track_info("track:a", "A"), None))
            .await
            .unwrap();

        coordinator.clear_all();
        client.slot_sender(0).send(SlotEvent::Playing).await.unwrap();
        settle().await;

        assert!(sink.take().is_empty());
    }
}
