// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of live sessions, at most one per recipient.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::{debug, info};

use parley_core::{Envelope, OfflineQueue, Transport};

use crate::session::{Delivery, Session, SessionConfig};

/// Maps recipients to their live session and routes deliveries.
///
/// Cloning is cheap; clones share the same sessions.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    sessions: RwLock<HashMap<String, Session>>,
    queue: Arc<dyn OfflineQueue>,
    config: SessionConfig,
    generation: AtomicU64,
}

impl RegistryInner {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the entry for `recipient` only if it is still `generation`.
    fn remove_if_current(&self, recipient: &str, generation: u64) {
        let mut sessions = self.write();
        if sessions
            .get(recipient)
            .is_some_and(|s| s.generation() == generation)
        {
            sessions.remove(recipient);
            debug!(recipient, generation, "session unregistered");
        }
    }
}

impl Registry {
    pub fn new(queue: Arc<dyn OfflineQueue>, config: SessionConfig) -> Self {
        Registry {
            inner: Arc::new(RegistryInner {
                sessions: RwLock::new(HashMap::new()),
                queue,
                config,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// The offline queue shared by every session.
    pub fn queue(&self) -> &Arc<dyn OfflineQueue> {
        &self.inner.queue
    }

    /// Settings every new session is started with.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Start a session for `recipient` over `transport`.
    ///
    /// An existing session for the same recipient is closed first, so its
    /// pending envelopes are queued before the new session loads the
    /// backlog. The entry is removed again when the session ends.
    pub fn register<T: Transport>(&self, recipient: &str, transport: T) -> Session {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;

        let session = {
            let mut sessions = self.inner.write();
            if let Some(previous) = sessions.remove(recipient) {
                info!(recipient, "replacing existing session");
                previous.close();
            }

            let session = Session::spawn(
                recipient,
                generation,
                transport,
                Arc::clone(&self.inner.queue),
                self.inner.config.clone(),
            );
            sessions.insert(recipient.to_string(), session.clone());
            session
        };

        self.watch(session.clone());
        info!(recipient, generation, "session registered");
        session
    }

    fn watch(&self, session: Session) {
        let registry: Weak<RegistryInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            session.closed().await;
            if let Some(inner) = registry.upgrade() {
                inner.remove_if_current(session.recipient(), session.generation());
            }
        });
    }

    /// Remove and close the session for `recipient`, if any.
    pub fn unregister(&self, recipient: &str) -> bool {
        let removed = self.inner.write().remove(recipient);
        match removed {
            Some(session) => {
                session.close();
                true
            }
            None => false,
        }
    }

    /// Route an envelope to the recipient's live session, or to the offline
    /// queue when the recipient is not connected.
    pub fn deliver(&self, recipient: &str, envelope: Envelope) -> parley_core::Result<Delivery> {
        if envelope.is_acknowledgement() {
            return Ok(Delivery::Discarded);
        }

        let session = self.inner.read().get(recipient).cloned();
        match session {
            Some(session) => session.send(envelope),
            None => {
                self.inner.queue.store(recipient, std::slice::from_ref(&envelope))?;
                debug!(recipient, id = %envelope.id, "recipient offline, envelope queued");
                Ok(Delivery::Queued)
            }
        }
    }

    /// Close every session. Used at shutdown.
    pub fn close_all(&self) {
        let sessions: Vec<Session> = self.inner.write().drain().map(|(_, s)| s).collect();
        let count = sessions.len();
        for session in sessions {
            session.close();
        }
        info!(count, "all sessions closed");
    }

    /// Whether `recipient` has a live session.
    pub fn is_online(&self, recipient: &str) -> bool {
        self.inner.read().contains_key(recipient)
    }

    /// The live session for `recipient`, if any.
    pub fn session(&self, recipient: &str) -> Option<Session> {
        self.inner.read().get(recipient).cloned()
    }

    /// Number of live sessions.
    pub fn online_count(&self) -> usize {
        self.inner.read().len()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
