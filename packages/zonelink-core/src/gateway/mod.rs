//! Control-bridge gateway: the shipped [`ZoneControlClient`].
//!
//! The control plane is reached through a single WebSocket carrying JSON
//! frames. Outbound [`GatewayRequest`] frames carry a numeric id; the bridge
//! answers unit operations with an [`GatewayFrame::Ack`] for that id and
//! streams session and slot callbacks as [`GatewayFrame::Session`] /
//! [`GatewayFrame::Slot`] frames keyed by the originating request id.
//!
//! [`GatewayZoneControl`] owns the correlation state. The socket handler
//! installs an outbound channel via [`GatewayZoneControl::connect`], feeds
//! every parsed inbound frame to [`GatewayZoneControl::handle_frame`], and
//! tears down with [`GatewayZoneControl::disconnect`] when the socket ends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use crate::control::traits::{AudioInput, ZoneTransport, ZoneVolume};
use crate::control::types::{
    ControlPlaneEvent, MuteAction, SessionEvent, SlotEvent, SlotKind, SlotPlayRequest,
    TransportAction, TransportControls,
};
use crate::error::{ZonelinkError, ZonelinkResult};
use crate::protocol_constants::{CONTROL_EVENT_CHANNEL_CAPACITY, GATEWAY_ACK_TIMEOUT_SECS};

// ─────────────────────────────────────────────────────────────────────────────
// Wire Frames
// ─────────────────────────────────────────────────────────────────────────────

/// One outbound request frame.
///
/// The id is unique per process and correlates acks and event streams back
/// to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayRequest {
    pub id: u64,
    #[serde(flatten)]
    pub op: ControlOp,
}

/// Operations the engine asks the control bridge to perform.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlOp {
    SeekAbsolute {
        zone_id: String,
        seconds: f64,
    },
    Transport {
        zone_id: String,
        action: TransportAction,
    },
    SetVolume {
        output_id: String,
        value: i32,
    },
    SetMute {
        output_id: String,
        action: MuteAction,
    },
    BeginSession {
        zone_id: String,
        display_name: String,
        icon_url: String,
    },
    Play {
        #[serde(flatten)]
        request: SlotPlayRequest,
    },
    ClearSlots {
        session_id: String,
        slots: Vec<SlotKind>,
    },
    UpdateTransportControls {
        session_id: String,
        controls: TransportControls,
    },
}

/// Inbound frames addressed to the gateway's correlation state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum GatewayFrame {
    /// Completion of a unit operation.
    Ack {
        id: u64,
        ok: bool,
        #[serde(default)]
        error: Option<String>,
    },
    /// Session lifecycle callback for an earlier `BeginSession`.
    Session {
        request_id: u64,
        event: SessionEvent,
    },
    /// Slot callback for an earlier `Play`.
    Slot { request_id: u64, event: SlotEvent },
}

/// Everything the control socket can carry inbound.
///
/// Both halves are internally tagged on `type`, so the untagged split is
/// unambiguous: correlation frames go to the gateway, zone lifecycle events
/// to the registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    Gateway(GatewayFrame),
    Control(ControlPlaneEvent),
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway
// ─────────────────────────────────────────────────────────────────────────────

type AckSender = oneshot::Sender<Result<(), String>>;

/// Correlated request/response client over the control-bridge socket.
pub struct GatewayZoneControl {
    next_request_id: AtomicU64,
    generation: AtomicU64,
    outbound: Mutex<Option<(u64, mpsc::UnboundedSender<GatewayRequest>)>>,
    pending_acks: DashMap<u64, AckSender>,
    session_streams: DashMap<u64, mpsc::Sender<SessionEvent>>,
    slot_streams: DashMap<u64, mpsc::Sender<SlotEvent>>,
    event_capacity: usize,
}

impl GatewayZoneControl {
    pub fn new() -> Self {
        Self::with_event_capacity(CONTROL_EVENT_CHANNEL_CAPACITY)
    }

    /// Creates a gateway whose per-request event channels hold up to
    /// `event_capacity` undelivered callbacks before the bridge reader
    /// has to wait.
    pub fn with_event_capacity(event_capacity: usize) -> Self {
        Self {
            next_request_id: AtomicU64::new(1),
            generation: AtomicU64::new(0),
            outbound: Mutex::new(None),
            pending_acks: DashMap::new(),
            session_streams: DashMap::new(),
            slot_streams: DashMap::new(),
            event_capacity,
        }
    }

    /// Installs a fresh outbound channel and returns its receiver together
    /// with the connection generation.
    ///
    /// The socket write task drains the receiver. Replacing an existing
    /// connection fails every in-flight request; their acks will never
    /// arrive on the dead socket.
    pub fn connect(&self) -> (u64, mpsc::UnboundedReceiver<GatewayRequest>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        let previous = self.outbound.lock().replace((generation, tx));
        if previous.is_some() {
            log::info!("[Gateway] Replacing control bridge connection");
            self.fail_inflight("control bridge replaced");
        }
        (generation, rx)
    }

    /// Tears down the connection identified by `generation`.
    ///
    /// A stale generation is ignored so a handler finishing its cleanup
    /// after a reconnect cannot break the new connection. Returns whether
    /// this call actually disconnected the current bridge; callers use it
    /// to decide whether the disconnect implies an unpair.
    pub fn disconnect(&self, generation: u64) -> bool {
        {
            let mut guard = self.outbound.lock();
            match guard.as_ref() {
                Some((current, _)) if *current == generation => {
                    guard.take();
                }
                _ => return false,
            }
        }
        log::info!("[Gateway] Control bridge disconnected");
        self.fail_inflight("control bridge disconnected");
        true
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.outbound.lock().is_some()
    }

    /// Routes one inbound frame to the caller waiting on its request id.
    pub async fn handle_frame(&self, frame: GatewayFrame) {
        match frame {
            GatewayFrame::Ack { id, ok, error } => {
                let Some((_, tx)) = self.pending_acks.remove(&id) else {
                    // Arrives after a timeout already failed the caller.
                    log::debug!("[Gateway] Ack for unknown request {id}");
                    return;
                };
                let result = if ok {
                    Ok(())
                } else {
                    Err(error.unwrap_or_else(|| "unspecified bridge error".to_string()))
                };
                let _ = tx.send(result);
            }
            GatewayFrame::Session { request_id, event } => {
                let Some(tx) = self
                    .session_streams
                    .get(&request_id)
                    .map(|entry| entry.value().clone())
                else {
                    log::trace!("[Gateway] Session event for unknown request {request_id}");
                    return;
                };
                // Terminal events end the stream; the bridge sends nothing
                // further for this request id.
                let terminal = matches!(
                    event,
                    SessionEvent::ZoneNotFound | SessionEvent::ZoneLost | SessionEvent::Ended
                );
                if tx.send(event).await.is_err() || terminal {
                    self.session_streams.remove(&request_id);
                }
            }
            GatewayFrame::Slot { request_id, event } => {
                let Some(tx) = self
                    .slot_streams
                    .get(&request_id)
                    .map(|entry| entry.value().clone())
                else {
                    log::trace!("[Gateway] Slot event for unknown request {request_id}");
                    return;
                };
                let terminal = matches!(
                    event,
                    SlotEvent::EndedNaturally | SlotEvent::MediaError | SlotEvent::StoppedUser
                );
                if tx.send(event).await.is_err() || terminal {
                    self.slot_streams.remove(&request_id);
                }
            }
        }
    }

    fn next_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::SeqCst)
    }

    fn send(&self, request: GatewayRequest) -> ZonelinkResult<()> {
        let guard = self.outbound.lock();
        let Some((_, tx)) = guard.as_ref() else {
            return Err(ZonelinkError::Gateway(
                "control bridge not connected".to_string(),
            ));
        };
        tx.send(request)
            .map_err(|_| ZonelinkError::Gateway("control bridge not connected".to_string()))
    }

    /// Sends a unit operation and waits for its ack.
    async fn request(&self, op: ControlOp) -> ZonelinkResult<()> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending_acks.insert(id, tx);

        if let Err(e) = self.send(GatewayRequest { id, op }) {
            self.pending_acks.remove(&id);
            return Err(e);
        }

        match timeout(Duration::from_secs(GATEWAY_ACK_TIMEOUT_SECS), rx).await {
            Ok(Ok(result)) => result.map_err(ZonelinkError::Gateway),
            Ok(Err(_)) => Err(ZonelinkError::Gateway(
                "control bridge disconnected".to_string(),
            )),
            Err(_) => {
                self.pending_acks.remove(&id);
                Err(ZonelinkError::Gateway(format!(
                    "request {id} timed out waiting for ack"
                )))
            }
        }
    }

    /// Fails every pending ack and closes every event stream.
    fn fail_inflight(&self, reason: &str) {
        let pending: Vec<u64> = self.pending_acks.iter().map(|entry| *entry.key()).collect();
        if !pending.is_empty() {
            log::warn!(
                "[Gateway] Failing {} in-flight request(s): {reason}",
                pending.len()
            );
        }
        for id in pending {
            if let Some((_, tx)) = self.pending_acks.remove(&id) {
                let _ = tx.send(Err(reason.to_string()));
            }
        }
        // Dropping the senders ends the session and slot pumps.
        self.session_streams.clear();
        self.slot_streams.clear();
    }
}

impl Default for GatewayZoneControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ZoneTransport for GatewayZoneControl {
    async fn seek_absolute(&self, zone_id: &str, seconds: f64) -> ZonelinkResult<()> {
        self.request(ControlOp::SeekAbsolute {
            zone_id: zone_id.to_string(),
            seconds,
        })
        .await
    }

    async fn transport(&self, zone_id: &str, action: TransportAction) -> ZonelinkResult<()> {
        self.request(ControlOp::Transport {
            zone_id: zone_id.to_string(),
            action,
        })
        .await
    }
}

#[async_trait]
impl ZoneVolume for GatewayZoneControl {
    async fn set_volume(&self, output_id: &str, value: i32) -> ZonelinkResult<()> {
        self.request(ControlOp::SetVolume {
            output_id: output_id.to_string(),
            value,
        })
        .await
    }

    async fn set_mute(&self, output_id: &str, action: MuteAction) -> ZonelinkResult<()> {
        self.request(ControlOp::SetMute {
            output_id: output_id.to_string(),
            action,
        })
        .await
    }
}

#[async_trait]
impl AudioInput for GatewayZoneControl {
    async fn begin_session(
        &self,
        zone_id: &str,
        display_name: &str,
        icon_url: &str,
    ) -> ZonelinkResult<mpsc::Receiver<SessionEvent>> {
        let id = self.next_id();
        let (tx, rx) = mpsc::channel(self.event_capacity);
        self.session_streams.insert(id, tx);

        let request = GatewayRequest {
            id,
            op: ControlOp::BeginSession {
                zone_id: zone_id.to_string(),
                display_name: display_name.to_string(),
                icon_url: icon_url.to_string(),
            },
        };
        if let Err(e) = self.send(request) {
            self.session_streams.remove(&id);
            return Err(e);
        }
        Ok(rx)
    }

    async fn play(&self, request: SlotPlayRequest) -> ZonelinkResult<mpsc::Receiver<SlotEvent>> {
        let id = self.next_id();
        let (tx, rx) = mpsc::channel(self.event_capacity);
        self.slot_streams.insert(id, tx);

        if let Err(e) = self.send(GatewayRequest {
            id,
            op: ControlOp::Play { request },
        }) {
            self.slot_streams.remove(&id);
            return Err(e);
        }
        Ok(rx)
    }

    async fn clear_slots(&self, session_id: &str, slots: Vec<SlotKind>) -> ZonelinkResult<()> {
        self.request(ControlOp::ClearSlots {
            session_id: session_id.to_string(),
            slots,
        })
        .await
    }

    async fn update_transport_controls(
        &self,
        session_id: &str,
        controls: TransportControls,
    ) -> ZonelinkResult<()> {
        self.request(ControlOp::UpdateTransportControls {
            session_id: session_id.to_string(),
            controls,
        })
        .await
    }
}
