//! Relay daemon - chat relay over newline-delimited TCP.
//!
//! # Usage
//!
//! ```bash
//! # Start on the default address (127.0.0.1:8888)
//! relayd
//!
//! # Custom address and a 60 second idle window
//! relayd --bind 0.0.0.0:7000 --idle-timeout-secs 60
//!
//! # Address via environment
//! RELAYD_BIND=127.0.0.1:9999 relayd
//!
//! # Enable debug logging
//! RUST_LOG=relayd=debug relayd
//! ```
//!
//! # Signal Handling
//!
//! SIGTERM/SIGINT: shutdown - stop accepting, close sessions.

use std::env;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use relayd::registry::spawn_registry;
use relayd::relay::spawn_relay;
use relayd::server::{RelayServer, DEFAULT_BIND_ADDR, DEFAULT_IDLE_TIMEOUT};

/// Relay daemon - in-memory chat relay
#[derive(Parser, Debug)]
#[command(name = "relayd", version, about)]
struct Args {
    /// Address to listen on (host:port); RELAYD_BIND is used when omitted
    #[arg(long)]
    bind: Option<String>,

    /// Seconds of inbound silence before a client is kicked
    #[arg(long)]
    idle_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("relayd=info".parse()?)
                .add_directive("relay_core=info".parse()?)
                .add_directive("relay_protocol=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let bind = args
        .bind
        .or_else(|| env::var("RELAYD_BIND").ok())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    let idle_timeout = args
        .idle_timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_IDLE_TIMEOUT);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %bind,
        idle_timeout_secs = idle_timeout.as_secs(),
        "relay daemon starting"
    );

    // Cancellation token for shutdown, fed by signals
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "error waiting for shutdown signal");
        }
        info!("shutdown signal received");
        shutdown_token.cancel();
    });

    // Registry actor + broadcast relay
    let registry = spawn_registry();
    let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();
    spawn_relay(broadcast_rx, registry.clone(), cancel_token.clone());

    // Accept loop runs until signalled
    let server = RelayServer::bind(&bind, registry, broadcast_tx, idle_timeout, cancel_token).await?;
    server.run().await?;

    info!("relay daemon stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("received Ctrl+C");
    }

    Ok(())
}
