// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! parley-core: Shared library for the parley delivery subsystem
//!
//! This crate provides the envelope wire format, application event payloads,
//! the offline queue contract with its storage engines, and the framed
//! transport contract used by both the relay server and the client agent.

pub mod envelope;
pub mod error;
pub mod event;
pub mod id;
pub mod memory;
pub mod queue;
pub mod store;
pub mod transport;
pub mod ws;

pub use envelope::{Category, Envelope, SyncPayload};
pub use error::{Error, Result};
pub use event::{Event, NewConversation, NewMessage, ParticipantAdded};
pub use id::generate_envelope_id;
pub use memory::MemoryTransport;
pub use queue::{MemoryQueue, OfflineQueue};
pub use store::SqliteQueue;
pub use transport::{
    BoxFuture, Frame, FrameReader, FrameWriter, Transport, TransportError, TransportResult,
};
pub use ws::WsTransport;
