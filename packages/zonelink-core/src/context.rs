//! Network configuration context for the engine.
//!
//! This module provides [`NetworkContext`] which bundles the address
//! information services need when constructing URLs for connected hosts. It
//! supports both explicit configuration (fixed deployments) and
//! auto-detection of the local IP.

use std::net::IpAddr;
#[cfg(test)]
use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::RwLock;

/// Network configuration shared across services.
///
/// Bundles the advertised IP and bound port that connected hosts (the
/// streaming host and control bridges) use to reach this server.
///
/// # Modes
///
/// - **Explicit**: bind port and advertise IP come from configuration. Use
///   [`NetworkContext::explicit`].
/// - **Auto-detect**: the local IP is detected at startup. Use
///   [`NetworkContext::auto_detect`].
#[derive(Clone)]
pub struct NetworkContext {
    /// Server port (initially 0 if auto-assigned, set when the listener
    /// binds).
    pub port: Arc<RwLock<u16>>,
    /// IP address connected hosts can reach us at.
    pub local_ip: Arc<RwLock<String>>,
}

impl NetworkContext {
    /// Creates a `NetworkContext` with explicit configuration.
    ///
    /// # Arguments
    ///
    /// * `bind_port` - Port to bind the server to (0 for auto-assign).
    /// * `advertise_ip` - IP address connected hosts can reach us at.
    #[must_use]
    pub fn explicit(bind_port: u16, advertise_ip: IpAddr) -> Self {
        Self {
            port: Arc::new(RwLock::new(bind_port)),
            local_ip: Arc::new(RwLock::new(advertise_ip.to_string())),
        }
    }

    /// Creates a `NetworkContext` that detects the local IP at startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial IP detection fails.
    pub fn auto_detect(
        preferred_port: u16,
        ip_detector: Arc<dyn IpDetector>,
    ) -> Result<Self, NetworkError> {
        let local_ip = ip_detector.detect()?;
        Ok(Self {
            port: Arc::new(RwLock::new(preferred_port)),
            local_ip: Arc::new(RwLock::new(local_ip)),
        })
    }

    /// Creates a `NetworkContext` for testing with a fixed IP.
    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::explicit(0, IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)))
    }

    /// Returns the current port value.
    #[must_use]
    pub fn get_port(&self) -> u16 {
        *self.port.read()
    }

    /// Returns the current local IP.
    #[must_use]
    pub fn get_local_ip(&self) -> String {
        self.local_ip.read().clone()
    }

    /// Records the port the listener actually bound.
    pub fn set_port(&self, port: u16) {
        *self.port.write() = port;
    }

    /// Returns a `UrlBuilder` for the current network configuration.
    #[must_use]
    pub fn url_builder(&self) -> UrlBuilder {
        UrlBuilder::new(self.get_local_ip(), self.get_port())
    }

    /// Returns the URL of the engine's own icon endpoint.
    #[must_use]
    pub fn icon_url(&self) -> String {
        self.url_builder().icon_url()
    }
}

/// Trait for detecting the local IP address.
///
/// Different environments may need different detection strategies; this
/// trait allows injecting the appropriate one.
pub trait IpDetector: Send + Sync {
    /// Detects the local IP address.
    fn detect(&self) -> Result<String, NetworkError>;
}

/// Default IP detector using the system's network interfaces.
#[derive(Debug, Clone, Default)]
pub struct LocalIpDetector;

impl LocalIpDetector {
    /// Creates a new `LocalIpDetector`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Creates a new `LocalIpDetector` wrapped in an Arc.
    #[must_use]
    pub fn arc() -> Arc<dyn IpDetector> {
        Arc::new(Self::new())
    }
}

impl IpDetector for LocalIpDetector {
    fn detect(&self) -> Result<String, NetworkError> {
        local_ip_address::local_ip()
            .map(|ip| ip.to_string())
            .map_err(|e| NetworkError::Detection(e.to_string()))
    }
}

/// Errors that can occur during network configuration.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Could not detect local IP address.
    #[error("Failed to detect local IP: {0}")]
    Detection(String),
}

/// Builder for this server's own URLs.
pub struct UrlBuilder {
    ip: String,
    port: u16,
}

impl UrlBuilder {
    /// Creates a new `UrlBuilder` for the given server address.
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// Returns the base URL for the server (e.g., `http://192.168.1.100:49500`).
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }

    /// Returns the icon URL announced with audio-input sessions.
    #[must_use]
    pub fn icon_url(&self) -> String {
        format!("{}/icon.png", self.base_url())
    }

    /// Returns the WebSocket URL the streaming host connects to.
    #[must_use]
    pub fn stream_socket_url(&self) -> String {
        format!("ws://{}:{}/ws/stream", self.ip, self.port)
    }

    /// Returns the WebSocket URL control bridges connect to.
    #[must_use]
    pub fn control_socket_url(&self) -> String {
        format!("ws://{}:{}/ws/control", self.ip, self.port)
    }
}

/// Builder for per-track media locators on the streaming host.
///
/// The host serves decoded audio itself; the engine only hands the control
/// plane a URL pointing back at the host's media endpoint.
#[derive(Debug, Clone)]
pub struct MediaUrlBuilder {
    base_url: String,
}

impl MediaUrlBuilder {
    /// Creates a builder from the configured media base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Returns the locator the control plane dereferences for one track's
    /// audio on one zone.
    #[must_use]
    pub fn media_url(&self, zone_id: &str, track_id: &str) -> String {
        format!(
            "{}/stream/{}/{}",
            self.base_url.trim_end_matches('/'),
            zone_id,
            track_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct MockIpDetector {
        ip: String,
    }

    impl IpDetector for MockIpDetector {
        fn detect(&self) -> Result<String, NetworkError> {
            Ok(self.ip.clone())
        }
    }

    struct FailingIpDetector;

    impl IpDetector for FailingIpDetector {
        fn detect(&self) -> Result<String, NetworkError> {
            Err(NetworkError::Detection("no interfaces up".to_string()))
        }
    }

    #[test]
    fn explicit_context_uses_provided_ip() {
        let ctx = NetworkContext::explicit(49500, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100)));
        assert_eq!(ctx.get_local_ip(), "192.168.1.100");
        assert_eq!(ctx.get_port(), 49500);
    }

    #[test]
    fn auto_detect_context_uses_detector() {
        let detector = Arc::new(MockIpDetector {
            ip: "10.0.0.5".to_string(),
        });
        let ctx = NetworkContext::auto_detect(0, detector).unwrap();
        assert_eq!(ctx.get_local_ip(), "10.0.0.5");
    }

    #[test]
    fn auto_detect_surfaces_detection_failure() {
        let result = NetworkContext::auto_detect(0, Arc::new(FailingIpDetector));
        assert!(matches!(result, Err(NetworkError::Detection(_))));
    }

    #[test]
    fn url_builder_generates_correct_urls() {
        let builder = UrlBuilder::new("192.168.1.100", 49500);
        assert_eq!(builder.base_url(), "http://192.168.1.100:49500");
        assert_eq!(builder.icon_url(), "http://192.168.1.100:49500/icon.png");
        assert_eq!(
            builder.stream_socket_url(),
            "ws://192.168.1.100:49500/ws/stream"
        );
        assert_eq!(
            builder.control_socket_url(),
            "ws://192.168.1.100:49500/ws/control"
        );
    }

    #[test]
    fn media_urls_join_against_trimmed_base() {
        let media = MediaUrlBuilder::new("http://192.168.1.50:36697/");
        assert_eq!(
            media.media_url("16015b", "track:4uLU6hMC"),
            "http://192.168.1.50:36697/stream/16015b/track:4uLU6hMC"
        );
    }
}
