//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the wire protocols on either side of the
//! engine (the connect-style streaming protocol and the control-bridge frame
//! protocol); changing them would break compatibility with connected hosts.

// ─────────────────────────────────────────────────────────────────────────────
// Streaming Volume Domain
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum value of the streaming protocol's volume domain.
///
/// The streaming side expresses volume as an unsigned 16-bit value; 65535 is
/// full scale and 0 doubles as the muted representation.
pub const STREAM_VOLUME_MAX: u16 = u16::MAX;

/// Divisor used when mapping a stream volume back into a native domain.
///
/// The inverse mapping divides by 65536 (not 65535) so that the top of the
/// stream domain lands exactly on the native maximum after rounding. This
/// matches the upstream protocol's own scaling.
pub const STREAM_VOLUME_SPAN: u32 = 65536;

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Default display name announced to the control plane when a zone session
/// is established.
///
/// Intentionally NOT localized since it appears in protocol data where
/// consistency matters more than translation. Overridable via configuration.
pub const DEFAULT_SESSION_NAME: &str = "Zonelink";

/// Service identifier reported by the status endpoint.
///
/// External tooling probes `/api/status` and expects this exact string to
/// identify a Zonelink server.
pub const SERVICE_ID: &str = "zonelink";

// ─────────────────────────────────────────────────────────────────────────────
// Channels & Timeouts
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the outbound message broadcast channel feeding the
/// streaming-host WebSocket.
pub const MESSAGE_CHANNEL_CAPACITY: usize = 100;

/// Capacity of the per-request session and slot event channels delivered by
/// the control bridge.
pub const CONTROL_EVENT_CHANNEL_CAPACITY: usize = 32;

/// Timeout for acknowledged control-bridge requests (seconds).
///
/// Unit operations (seek, transport, volume, mute, clear) wait this long for
/// the bridge's ack before failing. LAN round trips plus control-plane
/// processing fit comfortably.
pub const GATEWAY_ACK_TIMEOUT_SECS: u64 = 10;

/// Port range scanned when no preferred port is configured.
pub const PORT_SCAN_START: u16 = 49500;
pub const PORT_SCAN_END: u16 = 49510;
