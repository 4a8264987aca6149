// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection state of the peer agent.

use std::fmt;

/// Lifecycle of an [`Agent`](crate::Agent) connection.
///
/// `Disconnected → Connecting → Connected ⇄ Reconnecting`, and `Closed`
/// from any state once the agent is closed. Only `Connected` and
/// `Reconnecting` are reported to the state handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not connected; `connect` has not succeeded yet.
    Disconnected,
    /// First connection attempt in progress.
    Connecting,
    /// Connected to the relay.
    Connected,
    /// Connection lost, retrying with backoff.
    Reconnecting,
    /// Closed for good.
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closed => "closed",
        }
    }

    /// Whether this state is reported to the state handler.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected | ConnectionState::Reconnecting
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
