// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use super::*;
use crate::session::SessionConfig;
use chrono::{TimeZone, Utc};
use parley_core::{Category, MemoryQueue, OfflineQueue};

fn notifier() -> (Notifier, Arc<MemoryQueue>) {
    let queue = Arc::new(MemoryQueue::new());
    let shared: Arc<dyn OfflineQueue> = queue.clone();
    let registry = Registry::new(shared, SessionConfig::default());
    (Notifier::new(registry), queue)
}

fn names(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn new_message_skips_sender() {
    let (notifier, queue) = notifier();
    let message = NewMessage {
        conversation_id: "c1".into(),
        message_id: "msg-1".into(),
        sender_id: "alice".into(),
        content: vec![0xde, 0xad],
        created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    };

    let reached = notifier
        .new_message(&names(&["alice", "bob", "carol"]), &message)
        .unwrap();

    assert_eq!(reached, 2);
    assert!(queue.is_empty("alice").unwrap());
    for recipient in ["bob", "carol"] {
        let queued = queue.load_all(recipient).unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].category, Category::NewMessage);
        assert_eq!(NewMessage::from_envelope(&queued[0]).unwrap(), message);
    }

    // Each recipient gets its own envelope ID
    let bob = queue.load_all("bob").unwrap();
    let carol = queue.load_all("carol").unwrap();
    assert_ne!(bob[0].id, carol[0].id);
}

#[tokio::test]
async fn new_conversation_carries_per_invitee_keys() {
    let (notifier, queue) = notifier();
    let invitees = vec![
        Invitee {
            id: "bob".into(),
            key_distribution_message: vec![1],
        },
        Invitee {
            id: "carol".into(),
            key_distribution_message: vec![2],
        },
    ];

    let reached = notifier.new_conversation("alice", "c1", &invitees).unwrap();
    assert_eq!(reached, 2);

    let bob = NewConversation::from_envelope(&queue.load_all("bob").unwrap()[0]).unwrap();
    assert_eq!(bob.participant_ids, names(&["alice", "bob", "carol"]));
    assert_eq!(bob.key_distribution_message, vec![1]);

    let carol = NewConversation::from_envelope(&queue.load_all("carol").unwrap()[0]).unwrap();
    assert_eq!(carol.key_distribution_message, vec![2]);
    assert!(queue.is_empty("alice").unwrap());
}

#[tokio::test]
async fn participant_added_reaches_existing_members_only() {
    let (notifier, queue) = notifier();
    let event = ParticipantAdded {
        conversation_id: "c1".into(),
        sender_id: "alice".into(),
        added_ids: names(&["dave"]),
        key_distribution_message: Vec::new(),
    };

    let reached = notifier
        .participant_added(&names(&["alice", "bob", "carol", "dave"]), &event)
        .unwrap();

    assert_eq!(reached, 2);
    assert_eq!(queue.len("bob").unwrap(), 1);
    assert_eq!(queue.len("carol").unwrap(), 1);
    assert!(queue.is_empty("alice").unwrap());
    assert!(queue.is_empty("dave").unwrap());
}
