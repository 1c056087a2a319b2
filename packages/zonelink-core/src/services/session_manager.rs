//! Audio-input session management.
//!
//! Responsibilities:
//! - One idempotent session per zone: concurrent callers for the same zone
//!   share a single in-flight establishment and observe the same handle
//! - Seeding transport-control capability and the initial volume sync when
//!   a session is established
//! - Routing session-lifecycle events (skip requests, zone loss) arriving
//!   after establishment
//!
//! Unpairing bumps an epoch counter; establishments that were in flight
//! when the epoch moved are rejected instead of installed, and their event
//! pumps go quiet.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::context::NetworkContext;
use crate::control::traits::ZoneControlClient;
use crate::control::types::{SessionEvent, TransportControls, TransportRequest};
use crate::error::{ZonelinkError, ZonelinkResult};
use crate::messages::{MessageSink, StreamMessage};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::zone_registry::ZoneRegistry;
use crate::volume;

type Waiter = oneshot::Sender<ZonelinkResult<String>>;

/// Cached establishment state for one zone.
enum SessionState {
    /// Session handle issued by the control plane.
    Ready(String),
    /// Establishment in flight; callers queued for its outcome. The tag
    /// names the attempt that owns the entry, and outcomes from any other
    /// attempt must leave the entry alone.
    Pending { attempt: u64, waiters: Vec<Waiter> },
}

/// Per-zone session cache and lifecycle router.
pub struct SessionManager {
    sessions: DashMap<String, SessionState>,
    /// Bumped on unpair so in-flight establishments and stale pumps can
    /// tell their epoch is gone.
    epoch: AtomicU64,
    /// Hands each establishment attempt a distinct tag, across zones and
    /// across epochs.
    next_attempt_id: AtomicU64,
    client: Arc<dyn ZoneControlClient>,
    registry: Arc<ZoneRegistry>,
    sink: Arc<dyn MessageSink>,
    cancel: CancellationToken,
    spawner: TokioSpawner,
    network: NetworkContext,
    session_name: String,
    icon_override: Option<String>,
}

impl SessionManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<dyn ZoneControlClient>,
        registry: Arc<ZoneRegistry>,
        sink: Arc<dyn MessageSink>,
        cancel: CancellationToken,
        spawner: TokioSpawner,
        network: NetworkContext,
        session_name: String,
        icon_override: Option<String>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            epoch: AtomicU64::new(0),
            next_attempt_id: AtomicU64::new(0),
            client,
            registry,
            sink,
            cancel,
            spawner,
            network,
            session_name,
            icon_override,
        }
    }

    /// Returns the zone's session handle, establishing a session if none
    /// exists.
    ///
    /// At most one establishment runs per zone; concurrent callers suspend
    /// on the in-flight attempt and all observe the same outcome. A
    /// [`ZonelinkError::ZoneNotFound`] outcome clears the cache so a later
    /// command may retry.
    pub async fn get_or_create(self: &Arc<Self>, zone_id: &str) -> ZonelinkResult<String> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let attempt = self.next_attempt_id.fetch_add(1, Ordering::SeqCst);

        let waiter = match self.sessions.entry(zone_id.to_string()) {
            Entry::Occupied(mut occupied) => match occupied.get_mut() {
                SessionState::Ready(session_id) => return Ok(session_id.clone()),
                SessionState::Pending { waiters, .. } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(SessionState::Pending {
                    attempt,
                    waiters: Vec::new(),
                });
                None
            }
        };

        if let Some(rx) = waiter {
            return match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(ZonelinkError::Internal(
                    "session creation interrupted".into(),
                )),
            };
        }

        log::info!("[SessionManager] Establishing session for zone {zone_id}");
        match self.establish(zone_id).await {
            Ok((session_id, events)) => {
                let Some(waiters) = self.install_ready(zone_id, &session_id, attempt) else {
                    // The entry was cleared or reclaimed by a newer attempt
                    // while the handshake ran.
                    return Err(ZonelinkError::Unpaired);
                };
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    // Unpaired while the handshake was in flight.
                    self.drop_if_current(zone_id, &session_id);
                    for waiter in waiters {
                        let _ = waiter.send(Err(ZonelinkError::Unpaired));
                    }
                    return Err(ZonelinkError::Unpaired);
                }

                self.seed_session(zone_id, &session_id).await;
                for waiter in waiters {
                    let _ = waiter.send(Ok(session_id.clone()));
                }
                self.spawn_session_pump(zone_id.to_string(), session_id.clone(), events, epoch);
                Ok(session_id)
            }
            Err(err) => {
                log::warn!("[SessionManager] Session for zone {zone_id} failed: {err}");
                for waiter in self.take_pending(zone_id, attempt) {
                    let _ = waiter.send(Err(err.clone()));
                }
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    return Err(ZonelinkError::Unpaired);
                }
                Err(err)
            }
        }
    }

    /// Returns the cached handle without establishing anything.
    #[must_use]
    pub fn get_cached(&self, zone_id: &str) -> Option<String> {
        self.sessions.get(zone_id).and_then(|state| match state.value() {
            SessionState::Ready(session_id) => Some(session_id.clone()),
            SessionState::Pending { .. } => None,
        })
    }

    /// Number of established sessions.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| matches!(entry.value(), SessionState::Ready(_)))
            .count()
    }

    /// Discards all session state and moves to a new epoch. In-flight
    /// establishments and the callers suspended on them fail with
    /// [`ZonelinkError::Unpaired`]; pumps for the old epoch stop acting.
    pub fn clear_all(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.sessions.retain(|_, state| {
            if let SessionState::Pending { waiters, .. } = state {
                for waiter in waiters.drain(..) {
                    let _ = waiter.send(Err(ZonelinkError::Unpaired));
                }
            }
            false
        });
    }

    /// Begins a session and waits for the establishment outcome, handing
    /// back the event stream for the pump.
    async fn establish(
        &self,
        zone_id: &str,
    ) -> ZonelinkResult<(String, mpsc::Receiver<SessionEvent>)> {
        let icon_url = self
            .icon_override
            .clone()
            .unwrap_or_else(|| self.network.icon_url());
        let mut events = self
            .client
            .begin_session(zone_id, &self.session_name, &icon_url)
            .await?;

        loop {
            match events.recv().await {
                Some(SessionEvent::Began { session_id }) => return Ok((session_id, events)),
                Some(SessionEvent::ZoneNotFound) => {
                    return Err(ZonelinkError::ZoneNotFound {
                        zone_id: zone_id.to_string(),
                    })
                }
                Some(event) => {
                    log::debug!(
                        "[SessionManager] Ignoring {event:?} before establishment for {zone_id}"
                    );
                }
                None => {
                    return Err(ZonelinkError::Gateway(
                        "session event stream closed before establishment".into(),
                    ))
                }
            }
        }
    }

    /// Configures transport controls and sends the initial volume sync for
    /// a freshly established session.
    async fn seed_session(&self, zone_id: &str, session_id: &str) {
        let controls = TransportControls {
            is_previous_allowed: true,
            is_next_allowed: true,
        };
        if let Err(err) = self
            .client
            .update_transport_controls(session_id, controls)
            .await
        {
            log::warn!("[SessionManager] Failed to set transport controls for {zone_id}: {err}");
        }

        if let Some(zone) = self.registry.get(zone_id) {
            if let Some((_, info)) = zone.volume_output() {
                self.sink.send(StreamMessage::Volume {
                    id: zone_id.to_string(),
                    volume: volume::stream_volume(info),
                });
            }
        }
    }

    fn spawn_session_pump(
        self: &Arc<Self>,
        zone_id: String,
        session_id: String,
        mut events: mpsc::Receiver<SessionEvent>,
        epoch: u64,
    ) {
        let manager = Arc::clone(self);
        self.spawner.spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = manager.cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                if manager.epoch.load(Ordering::SeqCst) != epoch {
                    break;
                }
                match event {
                    SessionEvent::TransportControlRequest { control } => {
                        let message = match control {
                            TransportRequest::Next => StreamMessage::NextTrack {
                                id: zone_id.clone(),
                            },
                            TransportRequest::Previous => StreamMessage::PreviousTrack {
                                id: zone_id.clone(),
                            },
                        };
                        manager.sink.send(message);
                    }
                    terminal @ (SessionEvent::ZoneNotFound
                    | SessionEvent::ZoneLost
                    | SessionEvent::Ended) => {
                        log::info!(
                            "[SessionManager] Session for zone {zone_id} ended: {terminal:?}"
                        );
                        manager.drop_if_current(&zone_id, &session_id);
                        break;
                    }
                    SessionEvent::Began { .. } => {}
                }
            }
        });
    }

    /// Marks the zone ready and collects waiters queued during
    /// establishment. Returns `None` when the pending entry no longer
    /// belongs to this attempt; the handle must not be installed then.
    fn install_ready(
        &self,
        zone_id: &str,
        session_id: &str,
        attempt: u64,
    ) -> Option<Vec<Waiter>> {
        match self.sessions.entry(zone_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let owned = matches!(
                    occupied.get(),
                    SessionState::Pending { attempt: owner, .. } if *owner == attempt
                );
                if !owned {
                    return None;
                }
                let previous = std::mem::replace(
                    occupied.get_mut(),
                    SessionState::Ready(session_id.to_string()),
                );
                match previous {
                    SessionState::Pending { waiters, .. } => Some(waiters),
                    SessionState::Ready(_) => Some(Vec::new()),
                }
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Removes the pending entry, but only while it still belongs to this
    /// attempt.
    fn take_pending(&self, zone_id: &str, attempt: u64) -> Vec<Waiter> {
        let removed = self.sessions.remove_if(zone_id, |_, state| {
            matches!(state, SessionState::Pending { attempt: owner, .. } if *owner == attempt)
        });
        match removed {
            Some((_, SessionState::Pending { waiters, .. })) => waiters,
            _ => Vec::new(),
        }
    }

    /// Clears the cached handle only while it still belongs to the session
    /// that observed the loss.
    fn drop_if_current(&self, zone_id: &str, session_id: &str) {
        self.sessions.remove_if(zone_id, |_, state| {
            matches!(state, SessionState::Ready(current) if current == session_id)
        });
    }
}
