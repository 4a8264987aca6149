// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed application events carried inside envelopes.
//!
//! The delivery layer treats payloads as opaque; these types are the payload
//! shapes the chat application agrees on. Binary fields (ciphertext, key
//! distribution messages) are hex-encoded in JSON.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::envelope::{Category, Envelope};
use crate::error::{Error, Result};

/// An application event with a fixed envelope category.
pub trait Event: Serialize + DeserializeOwned {
    /// The category envelopes carrying this event are tagged with.
    const CATEGORY: Category;

    /// Wraps the event in an envelope with a fresh ID.
    fn to_envelope(&self) -> Result<Envelope> {
        Envelope::new(Self::CATEGORY, self)
    }

    /// Decodes the event from an envelope, checking its category.
    fn from_envelope(envelope: &Envelope) -> Result<Self> {
        if envelope.category != Self::CATEGORY {
            return Err(Error::UnexpectedCategory {
                expected: Self::CATEGORY,
                actual: envelope.category,
            });
        }
        envelope.payload_as()
    }
}

/// A message was posted to a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub conversation_id: String,
    pub message_id: String,
    pub sender_id: String,
    /// End-to-end encrypted message body.
    #[serde(with = "hex")]
    pub content: Vec<u8>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

impl Event for NewMessage {
    const CATEGORY: Category = Category::NewMessage;
}

/// The recipient was invited to a new conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewConversation {
    pub conversation_id: String,
    pub sender_id: String,
    /// Every participant, the creator first.
    pub participant_ids: Vec<String>,
    /// Sender-key distribution message addressed to this recipient.
    #[serde(with = "hex")]
    pub key_distribution_message: Vec<u8>,
}

impl Event for NewConversation {
    const CATEGORY: Category = Category::NewConversation;
}

/// Participants were added to a conversation the recipient belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantAdded {
    pub conversation_id: String,
    pub sender_id: String,
    /// The participants that joined.
    pub added_ids: Vec<String>,
    /// Sender-key distribution message addressed to this recipient.
    #[serde(default, with = "hex")]
    pub key_distribution_message: Vec<u8>,
}

impl Event for ParticipantAdded {
    const CATEGORY: Category = Category::ParticipantAdded;
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
