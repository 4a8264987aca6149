// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out of application events to conversation participants.
//!
//! Every recipient gets an envelope of its own with a fresh ID, routed
//! through [`Registry::deliver`]: live when connected, queued otherwise.

use tracing::{error, warn};

use parley_core::{Envelope, Event, NewConversation, NewMessage, ParticipantAdded};

use crate::registry::Registry;
use crate::session::Delivery;

/// A participant invited to a new conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitee {
    pub id: String,
    /// Sender-key distribution message encrypted for this participant.
    pub key_distribution_message: Vec<u8>,
}

/// Delivers typed events through a [`Registry`].
#[derive(Clone)]
pub struct Notifier {
    registry: Registry,
}

impl Notifier {
    pub fn new(registry: Registry) -> Self {
        Notifier { registry }
    }

    /// Notify every participant except the sender of a new message.
    ///
    /// Returns how many participants the message reached.
    pub fn new_message(
        &self,
        participant_ids: &[String],
        message: &NewMessage,
    ) -> parley_core::Result<usize> {
        let mut reached = 0;
        for recipient in participant_ids
            .iter()
            .filter(|id| **id != message.sender_id)
        {
            reached += self.deliver(recipient, message.to_envelope()?);
        }
        Ok(reached)
    }

    /// Invite each participant to a new conversation.
    ///
    /// The participant list carried in every notification is the sender
    /// followed by the invitees; each invitee gets its own key distribution
    /// message.
    pub fn new_conversation(
        &self,
        sender_id: &str,
        conversation_id: &str,
        invitees: &[Invitee],
    ) -> parley_core::Result<usize> {
        let participant_ids: Vec<String> = std::iter::once(sender_id.to_string())
            .chain(invitees.iter().map(|i| i.id.clone()))
            .collect();

        let mut reached = 0;
        for invitee in invitees {
            if invitee.id == sender_id {
                warn!(conversation_id, "sender listed as its own invitee, skipping");
                continue;
            }
            let event = NewConversation {
                conversation_id: conversation_id.to_string(),
                sender_id: sender_id.to_string(),
                participant_ids: participant_ids.clone(),
                key_distribution_message: invitee.key_distribution_message.clone(),
            };
            reached += self.deliver(&invitee.id, event.to_envelope()?);
        }
        Ok(reached)
    }

    /// Tell existing members that participants joined.
    ///
    /// Neither the sender nor the added participants are notified.
    pub fn participant_added(
        &self,
        member_ids: &[String],
        event: &ParticipantAdded,
    ) -> parley_core::Result<usize> {
        let mut reached = 0;
        for recipient in member_ids
            .iter()
            .filter(|id| **id != event.sender_id && !event.added_ids.contains(id))
        {
            reached += self.deliver(recipient, event.to_envelope()?);
        }
        Ok(reached)
    }

    /// Deliver one envelope, counting it when it was sent or queued.
    fn deliver(&self, recipient: &str, envelope: Envelope) -> usize {
        let id = envelope.id.clone();
        match self.registry.deliver(recipient, envelope) {
            Ok(Delivery::Live) | Ok(Delivery::Queued) => 1,
            Ok(Delivery::Discarded) => 0,
            Err(e) => {
                error!(recipient, id = %id, "notification lost: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
