// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    http_bare = { "http://localhost:8080", Some("ws://localhost:8080/ws") },
    https_bare = { "https://chat.example.com", Some("wss://chat.example.com/ws") },
    trailing_slash = { "http://localhost:8080/", Some("ws://localhost:8080/ws") },
    ws_bare = { "ws://127.0.0.1:7890", Some("ws://127.0.0.1:7890/ws") },
    explicit_path = { "wss://relay.example.com/socket", Some("wss://relay.example.com/socket") },
    explicit_ws_path = { "http://localhost/ws", Some("ws://localhost/ws") },
    whitespace = { "  http://localhost  ", Some("ws://localhost/ws") },
    ftp = { "ftp://example.com", None },
    no_scheme = { "localhost:8080", None },
    no_host = { "http://", None },
)]
fn normalize_server_url(input: &str, expected: Option<&str>) {
    assert_eq!(websocket_url(input).as_deref(), expected);
}

#[tokio::test]
async fn unsupported_url_fails_to_dial() {
    let dialer = WebSocketDialer::default();
    let err = dialer.dial("ftp://example.com", "token").await.err().unwrap();
    assert!(matches!(err, TransportError::ConnectionFailed(_)));
    assert!(err.to_string().contains("ftp://example.com"));
}

#[tokio::test]
async fn refused_connection_fails_to_dial() {
    // Bind then drop to find a port nothing listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let dialer = WebSocketDialer::new(Duration::from_secs(5));
    let result = dialer
        .dial(&format!("http://127.0.0.1:{}", port), "token")
        .await;
    assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
}
