//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to (0 scans the default range).
    /// Override: `ZONELINK_BIND_PORT`
    pub bind_port: u16,

    /// IP address to advertise in media and icon URLs.
    /// This should be the IP that the control plane can reach.
    /// If not specified, auto-detection will be attempted.
    /// Override: `ZONELINK_ADVERTISE_IP`
    pub advertise_ip: Option<IpAddr>,

    /// Source name announced to the control plane for zone sessions.
    /// Override: `ZONELINK_SESSION_NAME`
    pub session_name: Option<String>,

    /// Base URL of the streaming host's media endpoint. Playback commands
    /// fail until this is set.
    /// Override: `ZONELINK_MEDIA_BASE_URL`
    pub media_base_url: Option<String>,

    /// Base URL for resolving bare cover-image ids into artwork links.
    pub artwork_base_url: Option<String>,

    /// External icon URL announced with sessions instead of the built-in
    /// `/icon.png` endpoint.
    pub icon_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_port: 49500,
            advertise_ip: None,
            session_name: None,
            media_base_url: None,
            artwork_base_url: None,
            icon_url: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ZONELINK_BIND_PORT") {
            if let Ok(port) = val.parse() {
                self.bind_port = port;
            }
        }

        if let Ok(val) = std::env::var("ZONELINK_ADVERTISE_IP") {
            if let Ok(ip) = val.parse() {
                self.advertise_ip = Some(ip);
            }
        }

        if let Ok(val) = std::env::var("ZONELINK_SESSION_NAME") {
            if !val.trim().is_empty() {
                self.session_name = Some(val);
            }
        }

        if let Ok(val) = std::env::var("ZONELINK_MEDIA_BASE_URL") {
            if !val.trim().is_empty() {
                self.media_base_url = Some(val);
            }
        }
    }

    /// Converts to zonelink-core's Config type.
    pub fn to_core_config(&self) -> zonelink_core::Config {
        let defaults = zonelink_core::Config::default();
        zonelink_core::Config {
            preferred_port: self.bind_port,
            session_name: self
                .session_name
                .clone()
                .unwrap_or(defaults.session_name),
            icon_url: self.icon_url.clone(),
            artwork_base_url: self.artwork_base_url.clone(),
            media_base_url: self.media_base_url.clone(),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_errors() {
        let err = ServerConfig::load(Some(Path::new("/nonexistent/zonelink.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn yaml_fields_reach_the_core_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bind_port: 49505\nsession_name: Den\nmedia_base_url: http://10.0.0.9:4533/stream"
        )
        .unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        let core = config.to_core_config();

        assert_eq!(core.preferred_port, 49505);
        assert_eq!(core.session_name, "Den");
        assert_eq!(
            core.media_base_url.as_deref(),
            Some("http://10.0.0.9:4533/stream")
        );
        assert!(core.icon_url.is_none());
    }

    #[test]
    fn defaults_fill_unset_fields() {
        let core = ServerConfig::default().to_core_config();
        assert_eq!(core.preferred_port, 49500);
        assert_eq!(core.session_name, "Zonelink");
        assert!(core.media_base_url.is_none());
    }
}
