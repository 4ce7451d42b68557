//! Aria Proxy Daemon - transparent control-protocol proxy for multi-zone
//! amplifiers.
//!
//! This binary fans a single upstream controller session out to many
//! downstream clients, caching read-mostly state locally and relaying
//! unsolicited state-change notifications to every connected client.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use crate::config::DaemonConfig;

/// Aria Proxy Daemon - multi-client front end for one amplifier session.
#[derive(Parser, Debug)]
#[command(name = "aria-proxyd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Downstream bind address (overrides config file).
    #[arg(long, value_name = "HOST:PORT", env = "ARIA_LISTEN")]
    listen: Option<String>,

    /// Upstream controller address (overrides config file).
    #[arg(long, value_name = "HOST:PORT", env = "ARIA_CONNECT")]
    connect: Option<String>,

    /// Per-exchange timeout in milliseconds (overrides config file).
    #[arg(short = 't', long, value_name = "MS", env = "ARIA_TIMEOUT_MS")]
    timeout: Option<u64>,

    /// Path to the configuration file (YAML).
    #[arg(short = 'f', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (0..7, syslog style: 0-2 error, 3 warn, 4-5 info,
    /// 6 debug, 7 trace).
    #[arg(short = 'l', long, default_value_t = 4, env = "ARIA_LOG_LEVEL")]
    log_level: u8,
}

/// Maps the syslog-style numeric level onto the logger's filter.
fn level_filter(level: u8) -> log::LevelFilter {
    match level {
        0..=2 => log::LevelFilter::Error,
        3 => log::LevelFilter::Warn,
        4 | 5 => log::LevelFilter::Info,
        6 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(level_filter(args.log_level))
        .format_timestamp_millis()
        .init();

    log::info!("Aria Proxy Daemon v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = DaemonConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(connect) = args.connect {
        config.connect = connect;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_ms = timeout;
    }

    log::info!(
        "Configuration: listen={}, connect={}, timeout={}ms",
        config.listen,
        config.connect,
        config.timeout_ms
    );

    // Bind, connect, and start the engine. A bad bind or an unresolvable
    // upstream address is fatal; a refused upstream connection is not (the
    // connector retries with backoff).
    let services = aria_core::bootstrap(&config.to_core_config())
        .await
        .context("Failed to bootstrap proxy services")?;

    log::info!("Proxy listening on {}", services.local_addr);

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Graceful shutdown
    services.shutdown().await;

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
