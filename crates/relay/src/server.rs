// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server.
//!
//! Accepts TCP connections, authenticates the WebSocket handshake with a
//! bearer token and hands the upgraded connection to the [`Registry`] under
//! the authenticated recipient ID.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{header, StatusCode};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use parley_core::WsTransport;

use crate::auth::{bearer_token, Authenticator};
use crate::registry::Registry;

/// Shared state handed to every connection.
#[derive(Clone)]
pub struct Relay {
    registry: Registry,
    auth: Arc<dyn Authenticator>,
}

impl Relay {
    pub fn new(registry: Registry, auth: Arc<dyn Authenticator>) -> Self {
        Relay { registry, auth }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Accept connections until `shutdown` is cancelled, then close every
/// session.
pub async fn serve(
    listener: TcpListener,
    relay: Relay,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    info!("Listening on: {}", listener.local_addr()?);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                let relay = relay.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, peer_addr, relay).await {
                        debug!("Connection error from {}: {}", peer_addr, e);
                    }
                });
            }
        }
    }

    info!("Shutting down, closing sessions");
    relay.registry.close_all();
    Ok(())
}

/// Bind `addr` and serve until `shutdown` is cancelled.
pub async fn run(
    addr: SocketAddr,
    relay: Relay,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, relay, shutdown).await?;
    Ok(())
}

/// Caps inbound messages at the session read limit, so oversized frames are
/// refused by the WebSocket layer before they are buffered.
fn websocket_config(max_frame_size: usize) -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(max_frame_size))
        .max_frame_size(Some(max_frame_size))
}

fn unauthorized() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("unauthorized".to_string()));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response
}

/// Handle a single connection for its whole lifetime.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    relay: Relay,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut recipient = None;
    let authenticate = |request: &Request, response: Response| {
        let token = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token);
        match token.and_then(|t| relay.auth.authenticate(t)) {
            Some(id) => {
                recipient = Some(id);
                Ok(response)
            }
            None => Err(unauthorized()),
        }
    };

    let ws_config = websocket_config(relay.registry.config().max_frame_size);
    let accepted =
        tokio_tungstenite::accept_hdr_async_with_config(stream, authenticate, Some(ws_config)).await;
    let ws_stream = match accepted {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            warn!("Rejected handshake from {}: {}", peer_addr, e);
            return Err(e.into());
        }
    };
    let Some(recipient) = recipient else {
        error!("Handshake from {} completed without a recipient", peer_addr);
        return Ok(());
    };

    info!(recipient = %recipient, "New WebSocket connection from: {}", peer_addr);
    let session = relay
        .registry
        .register(&recipient, WsTransport::new(ws_stream));
    session.closed().await;

    info!(recipient = %recipient, "Connection closed: {}", peer_addr);
    Ok(())
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
