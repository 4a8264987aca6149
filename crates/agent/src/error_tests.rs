// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::state::ConnectionState;

#[test]
fn transport_errors_convert() {
    let err: AgentError = TransportError::ConnectionFailed("refused".into()).into();
    assert!(matches!(err, AgentError::Transport(_)));
    assert_eq!(err.to_string(), "failed to connect: connection failed: refused");
}

#[test]
fn already_connected_names_state() {
    let err = AgentError::AlreadyConnected(ConnectionState::Reconnecting);
    assert_eq!(err.to_string(), "agent is already reconnecting");
}
