//! Zonelink Server - Standalone headless bridge daemon.
//!
//! This binary hosts the Zonelink engine: it accepts the streaming host on
//! `/ws/stream`, the control bridge on `/ws/control`, and serves the status
//! API. It's designed for server deployments where Zonelink runs as a
//! background daemon.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use zonelink_core::{bootstrap_services, start_server, LocalIpDetector, NetworkContext};

use crate::config::ServerConfig;

/// Zonelink Server - Headless zone bridge for connect-style streaming hosts.
#[derive(Parser, Debug)]
#[command(name = "zonelink-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "ZONELINK_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "ZONELINK_BIND_PORT")]
    port: Option<u16>,

    /// Advertise IP address (overrides config file).
    #[arg(short = 'a', long, env = "ZONELINK_ADVERTISE_IP")]
    advertise_ip: Option<std::net::IpAddr>,

    /// Streaming host media base URL (overrides config file).
    #[arg(short = 'm', long, env = "ZONELINK_MEDIA_BASE_URL")]
    media_base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Zonelink Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(ip) = args.advertise_ip {
        config.advertise_ip = Some(ip);
    }
    if let Some(url) = args.media_base_url {
        config.media_base_url = Some(url);
    }

    // Resolve advertise IP: use explicit config, or fall back to auto-detection
    let network = if let Some(ip) = config.advertise_ip {
        log::info!(
            "Configuration: bind_port={}, advertise_ip={}",
            config.bind_port,
            ip
        );
        NetworkContext::explicit(config.bind_port, ip)
    } else {
        log::info!(
            "Configuration: bind_port={}, advertise_ip=auto",
            config.bind_port
        );
        let detector = LocalIpDetector::arc();
        NetworkContext::auto_detect(config.bind_port, detector).context(
            "Failed to auto-detect local IP address. \
             Please specify --advertise-ip or set ZONELINK_ADVERTISE_IP to the IP \
             address that the control plane can reach.",
        )?
    };

    if config.media_base_url.is_none() {
        log::warn!(
            "No media base URL configured - playback commands will fail until \
             ZONELINK_MEDIA_BASE_URL or media_base_url is set"
        );
    }

    // Bootstrap services with explicit network configuration
    let core_config = Arc::new(config.to_core_config());
    let services = bootstrap_services(Arc::clone(&core_config), network)
        .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    // Build app state for the HTTP server
    let app_state = services.app_state();

    // Spawn the HTTP server on the main tokio runtime. Both WebSocket
    // endpoints and the status API live on the same listener.
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state).await {
            log::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Graceful shutdown
    services.shutdown();

    // Abort the server task; in-flight sockets are gone with the process
    server_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
