// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Envelope wire format for server-client delivery.
//!
//! Every frame on the wire is a single JSON envelope:
//!
//! ```json
//! {"id": "1718000000000-4f2a9c01b7e3", "category": "new_message", "payload": {...}}
//! ```
//!
//! The payload is opaque to the delivery layer and is kept verbatim. The one
//! exception is [`Category::Sync`], whose payload is a [`SyncPayload`] listing
//! the recipient's offline backlog.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{Error, Result};
use crate::id::generate_envelope_id;

/// Category tag carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Category {
    /// Batch of envelopes that were queued while the recipient was offline.
    Sync,
    /// A new message in a conversation.
    NewMessage,
    /// The recipient was invited to a new conversation.
    NewConversation,
    /// Participants joined a conversation the recipient is part of.
    ParticipantAdded,
    /// Delivery confirmation for a previously received envelope.
    ///
    /// Never acknowledged and never queued.
    Acknowledgement,
}

impl Category {
    /// Every known category, in wire order.
    pub const ALL: [Category; 5] = [
        Category::Sync,
        Category::NewMessage,
        Category::NewConversation,
        Category::ParticipantAdded,
        Category::Acknowledgement,
    ];

    /// The wire name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sync => "sync",
            Category::NewMessage => "new_message",
            Category::NewConversation => "new_conversation",
            Category::ParticipantAdded => "participant_added",
            Category::Acknowledgement => "acknowledgement",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| Error::InvalidCategory(s.to_string()))
    }
}

/// The unit of transfer between relay and agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique ID used for acknowledgement correlation and queue keying.
    pub id: String,
    /// What kind of event this envelope carries.
    pub category: Category,
    /// Raw JSON payload, absent for acknowledgements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<RawValue>>,
}

/// Payload of a [`Category::Sync`] envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncPayload {
    /// The offline backlog, in the order it was queued.
    pub messages: Vec<Envelope>,
}

impl Envelope {
    /// Creates an envelope with an explicit ID and raw payload.
    pub fn with_id(
        id: impl Into<String>,
        category: Category,
        payload: Option<Box<RawValue>>,
    ) -> Self {
        Envelope {
            id: id.into(),
            category,
            payload,
        }
    }

    /// Creates an envelope with a fresh ID, serializing `payload` as JSON.
    pub fn new<T: Serialize>(category: Category, payload: &T) -> Result<Self> {
        let raw = serde_json::value::to_raw_value(payload)?;
        Ok(Envelope::with_id(generate_envelope_id(), category, Some(raw)))
    }

    /// Creates the acknowledgement for a received envelope ID.
    pub fn acknowledgement(id: impl Into<String>) -> Self {
        Envelope::with_id(id, Category::Acknowledgement, None)
    }

    /// Wraps an offline backlog into a single Sync envelope.
    pub fn sync(messages: Vec<Envelope>) -> Result<Self> {
        Envelope::new(Category::Sync, &SyncPayload { messages })
    }

    /// Whether this envelope is an acknowledgement.
    pub fn is_acknowledgement(&self) -> bool {
        self.category == Category::Acknowledgement
    }

    /// The raw payload JSON, if any.
    pub fn payload_str(&self) -> Option<&str> {
        self.payload.as_deref().map(RawValue::get)
    }

    /// Deserializes the payload into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = self
            .payload
            .as_deref()
            .ok_or_else(|| Error::MissingPayload(self.id.clone()))?;
        Ok(serde_json::from_str(raw.get())?)
    }

    /// Decodes the backlog carried by a Sync envelope.
    pub fn sync_batch(&self) -> Result<Vec<Envelope>> {
        if self.category != Category::Sync {
            return Err(Error::UnexpectedCategory {
                expected: Category::Sync,
                actual: self.category,
            });
        }
        Ok(self.payload_as::<SyncPayload>()?.messages)
    }

    /// Serializes the envelope to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes an envelope from JSON.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Deserializes an envelope from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.category == other.category
            && self.payload_str() == other.payload_str()
    }
}

impl Eq for Envelope {}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
