// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline queue for envelopes that could not be delivered live.
//!
//! The queue is keyed by (recipient, envelope ID) and ordered by insertion.
//! Storing an envelope whose key already exists replaces its body but keeps
//! its original position, so repeated stores never duplicate an entry.
//! Entries have no TTL; they stay until an acknowledgement deletes them.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::envelope::Envelope;
use crate::error::Result;

/// Durable per-recipient store of undelivered envelopes.
///
/// Implementations must be safe to share between every live session.
pub trait OfflineQueue: Send + Sync {
    /// Appends envelopes to the recipient's queue.
    fn store(&self, recipient: &str, envelopes: &[Envelope]) -> Result<()>;

    /// Removes the given envelope IDs from the recipient's queue.
    ///
    /// Unknown IDs are ignored.
    fn delete(&self, recipient: &str, ids: &[String]) -> Result<()>;

    /// Returns the recipient's queue in insertion order.
    fn load_all(&self, recipient: &str) -> Result<Vec<Envelope>>;

    /// Returns the number of queued envelopes for the recipient.
    fn len(&self, recipient: &str) -> Result<usize> {
        Ok(self.load_all(recipient)?.len())
    }

    /// Checks if the recipient's queue is empty.
    fn is_empty(&self, recipient: &str) -> Result<bool> {
        Ok(self.len(recipient)? == 0)
    }
}

/// In-memory offline queue.
///
/// Nothing survives a restart; used for tests and ephemeral relays.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    entries: Mutex<HashMap<String, Vec<Envelope>>>,
}

impl MemoryQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Vec<Envelope>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OfflineQueue for MemoryQueue {
    fn store(&self, recipient: &str, envelopes: &[Envelope]) -> Result<()> {
        if envelopes.is_empty() {
            return Ok(());
        }

        let mut entries = self.entries();
        let queue = entries.entry(recipient.to_string()).or_default();
        for envelope in envelopes {
            match queue.iter_mut().find(|queued| queued.id == envelope.id) {
                Some(existing) => *existing = envelope.clone(),
                None => queue.push(envelope.clone()),
            }
        }
        Ok(())
    }

    fn delete(&self, recipient: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut entries = self.entries();
        if let Some(queue) = entries.get_mut(recipient) {
            queue.retain(|envelope| !ids.contains(&envelope.id));
            if queue.is_empty() {
                entries.remove(recipient);
            }
        }
        Ok(())
    }

    fn load_all(&self, recipient: &str) -> Result<Vec<Envelope>> {
        Ok(self.entries().get(recipient).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
pub(crate) mod tests;
