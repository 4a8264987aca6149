// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! parley-agent: Client side of the parley delivery subsystem.
//!
//! The [`Agent`] holds a connection to the relay, acknowledges every
//! envelope it receives, dispatches envelopes to per-category handlers and
//! reconnects with exponential backoff when the connection drops.

pub mod agent;
pub mod backoff;
pub mod dialer;
pub mod error;
pub mod state;

pub use agent::{Agent, AgentConfig, MessageHandler, StateHandler};
pub use backoff::Backoff;
pub use dialer::{websocket_url, Dialer, WebSocketDialer};
pub use error::{AgentError, Result};
pub use state::ConnectionState;
