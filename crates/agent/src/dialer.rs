// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Establishing transports to the relay.
//!
//! The [`Dialer`] trait lets the agent run over any [`Transport`]; tests
//! dial in-memory pairs, production dials WebSockets.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::{connect_async, MaybeTlsStream};

use parley_core::{BoxFuture, Transport, TransportError, TransportResult, WsTransport};

/// Opens an authenticated transport to a server.
pub trait Dialer: Send + Sync + 'static {
    type Transport: Transport;

    /// Connect to `url`, presenting `credential` as a bearer token.
    fn dial<'a>(
        &'a self,
        url: &'a str,
        credential: &'a str,
    ) -> BoxFuture<'a, TransportResult<Self::Transport>>;
}

/// Dials WebSocket connections with tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WebSocketDialer {
    handshake_timeout: Duration,
}

impl Default for WebSocketDialer {
    fn default() -> Self {
        WebSocketDialer {
            handshake_timeout: Duration::from_secs(45),
        }
    }
}

impl WebSocketDialer {
    pub fn new(handshake_timeout: Duration) -> Self {
        WebSocketDialer { handshake_timeout }
    }
}

/// Turn a server address into the relay's WebSocket endpoint.
///
/// `http` and `https` map to `ws` and `wss`; `/ws` is appended when the
/// address has no path. Returns `None` for unsupported schemes.
pub fn websocket_url(server: &str) -> Option<String> {
    let server = server.trim();
    let (scheme, rest) = [
        ("https://", "wss"),
        ("http://", "ws"),
        ("wss://", "wss"),
        ("ws://", "ws"),
    ]
    .iter()
    .find_map(|(prefix, scheme)| server.strip_prefix(prefix).map(|rest| (*scheme, rest)))?;

    if rest.is_empty() || rest.starts_with('/') {
        return None;
    }

    Some(match rest.find('/') {
        None => format!("{}://{}/ws", scheme, rest),
        Some(i) if &rest[i..] == "/" => format!("{}://{}/ws", scheme, &rest[..i]),
        Some(_) => format!("{}://{}", scheme, rest),
    })
}

impl Dialer for WebSocketDialer {
    type Transport = WsTransport<MaybeTlsStream<TcpStream>>;

    fn dial<'a>(
        &'a self,
        url: &'a str,
        credential: &'a str,
    ) -> BoxFuture<'a, TransportResult<Self::Transport>> {
        Box::pin(async move {
            let endpoint = websocket_url(url).ok_or_else(|| {
                TransportError::ConnectionFailed(format!("unsupported server url '{}'", url))
            })?;

            let mut request = endpoint
                .into_client_request()
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {}", credential))
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            request.headers_mut().insert(header::AUTHORIZATION, bearer);

            let (stream, _) = timeout(self.handshake_timeout, connect_async(request))
                .await
                .map_err(|_| TransportError::DeadlineExceeded("handshake"))?
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            Ok(WsTransport::new(stream))
        })
    }
}

#[cfg(test)]
#[path = "dialer_tests.rs"]
mod tests;
