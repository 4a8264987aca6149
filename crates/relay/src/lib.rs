// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! parley-relay: Reliable real-time delivery server.
//!
//! Keeps one [`Session`] per connected recipient, tracks every envelope until
//! the recipient acknowledges it, and falls back to the offline queue when a
//! recipient is away. Queued envelopes are synced in one batch on reconnect.

pub mod auth;
pub mod config;
pub mod notify;
pub mod registry;
pub mod server;
pub mod session;

pub use auth::{Authenticator, StaticTokens};
pub use config::{ConfigError, RelayConfig};
pub use notify::{Invitee, Notifier};
pub use registry::Registry;
pub use server::Relay;
pub use session::{Delivery, Session, SessionConfig};
