// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the offline queue contract.
//!
//! The `check_*` functions describe behavior every engine must share and are
//! reused by the SQLite engine's tests.

#![allow(clippy::unwrap_used)]

use super::*;
use crate::envelope::Category;
use serde_json::json;

pub(crate) fn envelope(id: &str) -> Envelope {
    let payload = serde_json::value::to_raw_value(&json!({"content": id})).unwrap();
    Envelope::with_id(id, Category::NewMessage, Some(payload))
}

fn ids(envelopes: &[Envelope]) -> Vec<&str> {
    envelopes.iter().map(|e| e.id.as_str()).collect()
}

pub(crate) fn check_insertion_order(queue: &dyn OfflineQueue) {
    queue.store("alice", &[envelope("m1"), envelope("m2")]).unwrap();
    queue.store("alice", &[envelope("m3")]).unwrap();

    assert_eq!(ids(&queue.load_all("alice").unwrap()), vec!["m1", "m2", "m3"]);
    assert_eq!(queue.len("alice").unwrap(), 3);
}

pub(crate) fn check_recipients_are_isolated(queue: &dyn OfflineQueue) {
    queue.store("alice", &[envelope("m1")]).unwrap();
    queue.store("bob", &[envelope("m1"), envelope("m2")]).unwrap();

    queue.delete("bob", &["m1".to_string()]).unwrap();

    assert_eq!(ids(&queue.load_all("alice").unwrap()), vec!["m1"]);
    assert_eq!(ids(&queue.load_all("bob").unwrap()), vec!["m2"]);
    assert!(queue.is_empty("carol").unwrap());
}

pub(crate) fn check_restore_does_not_duplicate(queue: &dyn OfflineQueue) {
    queue.store("alice", &[envelope("m1"), envelope("m2")]).unwrap();
    queue.store("alice", &[envelope("m1")]).unwrap();
    queue.store("alice", &[envelope("m1")]).unwrap();

    assert_eq!(ids(&queue.load_all("alice").unwrap()), vec!["m1", "m2"]);
}

pub(crate) fn check_delete(queue: &dyn OfflineQueue) {
    queue
        .store("alice", &[envelope("m1"), envelope("m2"), envelope("m3")])
        .unwrap();

    queue
        .delete("alice", &["m1".to_string(), "m3".to_string(), "nope".to_string()])
        .unwrap();
    assert_eq!(ids(&queue.load_all("alice").unwrap()), vec!["m2"]);

    queue.delete("alice", &[]).unwrap();
    queue.delete("nobody", &["m2".to_string()]).unwrap();
    assert_eq!(queue.len("alice").unwrap(), 1);
}

pub(crate) fn check_roundtrip_preserves_envelope(queue: &dyn OfflineQueue) {
    let sync = Envelope::sync(vec![envelope("m1")]).unwrap();
    queue.store("alice", &[sync.clone()]).unwrap();

    let loaded = queue.load_all("alice").unwrap();
    assert_eq!(loaded, vec![sync]);
}

#[test]
fn memory_insertion_order() {
    check_insertion_order(&MemoryQueue::new());
}

#[test]
fn memory_recipients_are_isolated() {
    check_recipients_are_isolated(&MemoryQueue::new());
}

#[test]
fn memory_restore_does_not_duplicate() {
    check_restore_does_not_duplicate(&MemoryQueue::new());
}

#[test]
fn memory_delete() {
    check_delete(&MemoryQueue::new());
}

#[test]
fn memory_roundtrip_preserves_envelope() {
    check_roundtrip_preserves_envelope(&MemoryQueue::new());
}

#[test]
fn memory_store_empty_is_noop() {
    let queue = MemoryQueue::new();
    queue.store("alice", &[]).unwrap();
    assert!(queue.load_all("alice").unwrap().is_empty());
}

#[test]
fn memory_concurrent_recipients() {
    use std::sync::Arc;

    let queue = Arc::new(MemoryQueue::new());
    let handles: Vec<_> = (0..8)
        .map(|n| {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                let recipient = format!("user-{}", n);
                for i in 0..50 {
                    queue
                        .store(&recipient, &[envelope(&format!("m{}", i))])
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for n in 0..8 {
        assert_eq!(queue.len(&format!("user-{}", n)).unwrap(), 50);
    }
}
