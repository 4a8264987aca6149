// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the peer agent.

use parley_core::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to connect: {0}")]
    Transport(#[from] TransportError),

    #[error("agent is closed")]
    Closed,

    #[error("agent is already {0}")]
    AlreadyConnected(crate::state::ConnectionState),
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
