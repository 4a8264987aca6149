// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! parley-relay: WebSocket delivery server.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use parley_core::{OfflineQueue, SqliteQueue};
use parley_relay::{server, Registry, Relay, RelayConfig, StaticTokens};

const QUEUE_FILE_NAME: &str = "queue.db";

/// parley-relay: Reliable real-time delivery server
#[derive(Parser, Debug)]
#[command(name = "parley-relay")]
#[command(about = "WebSocket relay with acknowledged delivery and offline queueing")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Directory for the offline queue database
    #[arg(short, long, default_value = ".")]
    data: PathBuf,

    /// Path to a TOML config file with session settings and accounts
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };

    info!("Starting parley-relay");
    info!("  Bind address: {}", args.bind);
    info!("  Data directory: {}", args.data.display());
    info!("  Accounts: {}", config.accounts.len());
    if config.accounts.is_empty() {
        warn!("No accounts configured, every connection will be rejected");
    }

    let store = SqliteQueue::open(&args.data.join(QUEUE_FILE_NAME))?;
    let backlog = store.recipients()?;
    info!("  Queued backlog for {} recipients", backlog.len());
    let queue: Arc<dyn OfflineQueue> = Arc::new(store);
    let registry = Registry::new(queue, config.session_config());
    let relay = Relay::new(registry, Arc::new(StaticTokens::new(&config.accounts)));

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received");
                signal.cancel();
            }
            Err(e) => warn!("Failed to listen for interrupt: {}", e),
        }
    });

    server::run(args.bind, relay, shutdown).await?;

    info!("parley-relay stopped");
    Ok(())
}
