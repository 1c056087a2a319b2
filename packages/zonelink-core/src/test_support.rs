//! Shared fixtures and mocks for service tests.
//!
//! The mock control client records every call and hands out channels the
//! tests can push session/slot events through, standing in for the control
//! bridge.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::control::traits::{AudioInput, ZoneTransport, ZoneVolume};
use crate::control::types::{
    MuteAction, Output, SessionEvent, SlotEvent, SlotKind, SlotPlayRequest, TransportAction,
    TransportControls, VolumeInfo, Zone,
};
use crate::error::ZonelinkResult;
use crate::messages::{MessageSink, StreamMessage, TrackInfo};

/// Sink that records outbound stream messages for assertions.
#[derive(Default)]
pub(crate) struct RecordingMessageSink {
    messages: Mutex<Vec<StreamMessage>>,
}

impl RecordingMessageSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Drains and returns everything recorded so far.
    pub(crate) fn take(&self) -> Vec<StreamMessage> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl MessageSink for RecordingMessageSink {
    fn send(&self, message: StreamMessage) {
        self.messages.lock().push(message);
    }
}

/// Zone with a single stepped 0..=100 output.
pub(crate) fn stepped_zone(zone_id: &str, name: &str, value: i32, is_muted: bool) -> Zone {
    Zone {
        zone_id: zone_id.to_string(),
        display_name: name.to_string(),
        outputs: vec![Output {
            output_id: format!("{zone_id}-out"),
            volume: Some(VolumeInfo {
                min: 0,
                max: 100,
                step: 1,
                value,
                is_muted,
            }),
        }],
    }
}

/// Zone with two outputs (volume sync unsupported).
pub(crate) fn grouped_zone(zone_id: &str, name: &str) -> Zone {
    Zone {
        zone_id: zone_id.to_string(),
        display_name: name.to_string(),
        outputs: vec![
            Output {
                output_id: format!("{zone_id}-a"),
                volume: Some(VolumeInfo {
                    min: 0,
                    max: 100,
                    step: 1,
                    value: 30,
                    is_muted: false,
                }),
            },
            Output {
                output_id: format!("{zone_id}-b"),
                volume: None,
            },
        ],
    }
}

pub(crate) fn track_info(track_id: &str, name: &str) -> TrackInfo {
    TrackInfo {
        track_id: track_id.to_string(),
        name: Some(name.to_string()),
        album_name: Some("Test Album".to_string()),
        artists: Some(vec!["Test Artist".to_string()]),
        covers: None,
        show_name: None,
    }
}

/// Mock control client recording calls and exposing event channels.
///
/// `begin_session` answers with `Began { session_id: "session-N" }` (or
/// `ZoneNotFound` when toggled) and keeps the sender so tests can deliver
/// later lifecycle events. `play` keeps one sender per request, in call
/// order, for driving slot events.
#[derive(Default)]
pub(crate) struct MockZoneControl {
    pub begin_session_calls: AtomicUsize,
    pub play_calls: AtomicUsize,
    pub fail_with_zone_not_found: AtomicBool,
    pub begin_session_delay: Mutex<Option<Duration>>,
    pub session_senders: Mutex<Vec<mpsc::Sender<SessionEvent>>>,
    pub slot_senders: Mutex<Vec<mpsc::Sender<SlotEvent>>>,
    pub play_requests: Mutex<Vec<SlotPlayRequest>>,
    pub seeks: Mutex<Vec<(String, f64)>>,
    pub transports: Mutex<Vec<(String, TransportAction)>>,
    pub volumes: Mutex<Vec<(String, i32)>>,
    pub mutes: Mutex<Vec<(String, MuteAction)>>,
    pub cleared_slots: Mutex<Vec<(String, Vec<SlotKind>)>>,
    pub transport_controls: Mutex<Vec<(String, TransportControls)>>,
}

impl MockZoneControl {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sender for the nth slot play request issued.
    pub(crate) fn slot_sender(&self, index: usize) -> mpsc::Sender<SlotEvent> {
        self.slot_senders.lock()[index].clone()
    }

    /// Sender for the nth session established.
    pub(crate) fn session_sender(&self, index: usize) -> mpsc::Sender<SessionEvent> {
        self.session_senders.lock()[index].clone()
    }
}

#[async_trait]
impl ZoneTransport for MockZoneControl {
    async fn seek_absolute(&self, zone_id: &str, seconds: f64) -> ZonelinkResult<()> {
        self.seeks.lock().push((zone_id.to_string(), seconds));
        Ok(())
    }

    async fn transport(&self, zone_id: &str, action: TransportAction) -> ZonelinkResult<()> {
        self.transports.lock().push((zone_id.to_string(), action));
        Ok(())
    }
}

#[async_trait]
impl ZoneVolume for MockZoneControl {
    async fn set_volume(&self, output_id: &str, value: i32) -> ZonelinkResult<()> {
        self.volumes.lock().push((output_id.to_string(), value));
        Ok(())
    }

    async fn set_mute(&self, output_id: &str, action: MuteAction) -> ZonelinkResult<()> {
        self.mutes.lock().push((output_id.to_string(), action));
        Ok(())
    }
}

#[async_trait]
impl AudioInput for MockZoneControl {
    async fn begin_session(
        &self,
        _zone_id: &str,
        _display_name: &str,
        _icon_url: &str,
    ) -> ZonelinkResult<mpsc::Receiver<SessionEvent>> {
        let n = self.begin_session_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *self.begin_session_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let (tx, rx) = mpsc::channel(8);
        let first = if self.fail_with_zone_not_found.load(Ordering::SeqCst) {
            SessionEvent::ZoneNotFound
        } else {
            SessionEvent::Began {
                session_id: format!("session-{n}"),
            }
        };
        tx.send(first).await.ok();
        self.session_senders.lock().push(tx);
        Ok(rx)
    }

    async fn play(
        &self,
        request: SlotPlayRequest,
    ) -> ZonelinkResult<mpsc::Receiver<SlotEvent>> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        self.play_requests.lock().push(request);
        let (tx, rx) = mpsc::channel(8);
        self.slot_senders.lock().push(tx);
        Ok(rx)
    }

    async fn clear_slots(&self, session_id: &str, slots: Vec<SlotKind>) -> ZonelinkResult<()> {
        self.cleared_slots.lock().push((session_id.to_string(), slots));
        Ok(())
    }

    async fn update_transport_controls(
        &self,
        session_id: &str,
        controls: TransportControls,
    ) -> ZonelinkResult<()> {
        self.transport_controls
            .lock()
            .push((session_id.to_string(), controls));
        Ok(())
    }
}

/// Fully wired [`AppState`](crate::api::AppState) over the mock client.
///
/// The mock and sink are returned alongside so tests can script control
/// events and inspect outbound messages.
pub(crate) fn app_state() -> (
    crate::api::AppState,
    Arc<MockZoneControl>,
    Arc<RecordingMessageSink>,
) {
    use crate::api::AppState;
    use crate::context::NetworkContext;
    use crate::gateway::GatewayZoneControl;
    use crate::messages::MessageBridge;
    use crate::runtime::TokioSpawner;
    use crate::services::{ProtocolTranslator, SessionManager, SlotCoordinator, ZoneRegistry};
    use crate::state::Config;

    let client = MockZoneControl::new();
    let sink = RecordingMessageSink::new();
    let registry = Arc::new(ZoneRegistry::new(sink.clone()));
    let network = NetworkContext::for_test();
    let cancel = tokio_util::sync::CancellationToken::new();
    let sessions = Arc::new(SessionManager::new(
        client.clone(),
        Arc::clone(&registry),
        sink.clone(),
        cancel.clone(),
        TokioSpawner::current(),
        network.clone(),
        "Zonelink".to_string(),
        None,
    ));
    let slots = Arc::new(SlotCoordinator::new(
        client.clone(),
        sink.clone(),
        cancel,
        TokioSpawner::current(),
    ));
    let translator = Arc::new(ProtocolTranslator::new(
        Arc::clone(&registry),
        Arc::clone(&sessions),
        Arc::clone(&slots),
        client.clone(),
        None,
        None,
    ));

    let state = AppState::builder()
        .registry(registry)
        .sessions(sessions)
        .slots(slots)
        .translator(translator)
        .gateway(Arc::new(GatewayZoneControl::new()))
        .bridge(MessageBridge::new(8))
        .network(network)
        .config(Arc::new(Config::default()))
        .build();
    (state, client, sink)
}
