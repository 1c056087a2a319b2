//! Core configuration types.
//!
//! [`Config`] holds the engine settings shared across services. Hosting
//! binaries construct it from their own configuration surface (files, env,
//! CLI) and hand it to [`crate::bootstrap::bootstrap_services`].

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    CONTROL_EVENT_CHANNEL_CAPACITY, DEFAULT_SESSION_NAME, MESSAGE_CHANNEL_CAPACITY,
};

/// Configuration for the Zonelink engine.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Preferred port for the HTTP/WS server (0 = scan the default range).
    pub preferred_port: u16,

    /// Source name announced to the control plane for audio-input sessions.
    pub session_name: String,

    /// Overrides the icon URL announced with sessions. When unset, the
    /// engine's own `/icon.png` endpoint is announced.
    pub icon_url: Option<String>,

    /// Base URL for resolving bare cover-image ids into artwork links.
    /// When unset, tracks with bare cover ids render without an image.
    pub artwork_base_url: Option<String>,

    /// Base URL of the streaming host's media endpoint, used to build the
    /// per-track locators the control plane fetches audio from. Playback
    /// commands fail with a configuration error while unset.
    pub media_base_url: Option<String>,

    /// Capacity of the outbound stream-message broadcast channel.
    pub message_channel_capacity: usize,

    /// Capacity of per-request session/slot event channels.
    pub control_event_channel_capacity: usize,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.session_name.trim().is_empty() {
            return Err("session_name must not be empty".to_string());
        }
        if self.message_channel_capacity == 0 {
            return Err(
                "message_channel_capacity must be >= 1 (broadcast::channel panics on 0)"
                    .to_string(),
            );
        }
        if self.control_event_channel_capacity == 0 {
            return Err("control_event_channel_capacity must be >= 1".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 0,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            icon_url: None,
            artwork_base_url: None,
            media_base_url: None,
            message_channel_capacity: MESSAGE_CHANNEL_CAPACITY,
            control_event_channel_capacity: CONTROL_EVENT_CHANNEL_CAPACITY,
        }
    }
}
