// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! parley: Command-line client for a parley relay.

use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use parley_agent::{Agent, AgentConfig, ConnectionState};
use parley_core::{Category, Envelope};

/// parley: Client for the parley delivery relay
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Client for the parley delivery relay")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect and log every envelope received until interrupted
    Listen {
        /// Relay address (http://, https://, ws:// or wss://)
        #[arg(short, long, default_value = "http://localhost:7890")]
        url: String,

        /// Bearer token identifying the recipient
        #[arg(short, long)]
        token: String,

        /// Only log these categories (repeatable; default: all)
        #[arg(short, long = "category")]
        categories: Vec<Category>,

        /// Maximum delay between reconnection attempts, in seconds
        #[arg(long, default_value = "30")]
        max_backoff: u64,
    },
}

fn log_envelope(envelope: &Envelope) {
    if envelope.category == Category::Sync {
        match envelope.sync_batch() {
            Ok(batch) => {
                info!(id = %envelope.id, count = batch.len(), "sync batch received");
                for queued in &batch {
                    log_envelope(queued);
                }
            }
            Err(e) => warn!(id = %envelope.id, "unreadable sync batch: {}", e),
        }
        return;
    }

    info!(
        id = %envelope.id,
        category = %envelope.category,
        payload = envelope.payload_str().unwrap_or(""),
        "envelope received"
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Listen {
            url,
            token,
            categories,
            max_backoff,
        } => {
            let config = AgentConfig {
                url,
                max_backoff: Duration::from_secs(max_backoff.max(1)),
                ..AgentConfig::default()
            };
            let agent = Agent::new(config);

            let wanted = if categories.is_empty() {
                Category::ALL
                    .iter()
                    .copied()
                    .filter(|c| *c != Category::Acknowledgement)
                    .collect()
            } else {
                categories
            };
            for category in wanted {
                agent.set_message_handler(category, |envelope| log_envelope(&envelope));
            }
            agent.set_connection_state_handler(|state| match state {
                ConnectionState::Reconnecting => warn!("connection lost, reconnecting"),
                state => info!("connection {}", state),
            });

            agent.connect(&token).await?;

            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!("Failed to listen for interrupt: {}", e);
                    }
                }
                _ = agent.closed() => {}
            }
            agent.close();
        }
    }

    Ok(())
}
