// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server-side session for one connected recipient.
//!
//! A session owns one transport and runs two tasks over it:
//!
//! - the write loop, the only writer on the connection, which drains the
//!   bounded outbound channel and pings on a fixed period;
//! - the read loop, which enforces the read deadline and consumes
//!   acknowledgements from the peer.
//!
//! Every envelope handed to the write path is tracked as pending until the
//! peer acknowledges it. Pending envelopes older than the read timeout, and
//! every pending envelope left when the session closes, are moved to the
//! offline queue so nothing is lost with the connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{timeout, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use parley_core::{
    Category, Envelope, Frame, FrameReader, FrameWriter, OfflineQueue, Transport, TransportError,
    TransportResult,
};

/// Timing and sizing knobs for sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Time allowed to write one frame to the peer.
    pub write_wait: Duration,
    /// Read timeout; also the age at which an unacknowledged send expires.
    pub read_wait: Duration,
    /// Ping interval. Must be shorter than `read_wait`.
    pub ping_period: Duration,
    /// Capacity of the outbound channel.
    pub outbound_capacity: usize,
    /// Largest inbound frame accepted, in bytes.
    pub max_frame_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            write_wait: Duration::from_secs(10),
            read_wait: Duration::from_secs(60),
            ping_period: Duration::from_secs(54),
            outbound_capacity: 256,
            max_frame_size: 512,
        }
    }
}

/// Outcome of handing an envelope to a session or the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Enqueued for the live connection and awaiting acknowledgement.
    Live,
    /// Persisted to the offline queue for a later sync.
    Queued,
    /// Not delivered at all (acknowledgements are never relayed).
    Discarded,
}

/// Handle to a live session. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    recipient: String,
    generation: u64,
    config: SessionConfig,
    queue: Arc<dyn OfflineQueue>,
    state: Mutex<SessionState>,
    /// Held while envelopes move from pending to the offline queue, and
    /// while an acknowledgement is applied, so an ack never lands between
    /// the two.
    requeue: Mutex<()>,
    closed: AtomicBool,
    /// Stops both loops.
    shutdown: CancellationToken,
    /// Cancelled once pending envelopes have been flushed.
    flushed: CancellationToken,
}

struct SessionState {
    /// Sender side of the outbound channel; `None` once closed.
    outbound: Option<mpsc::Sender<Envelope>>,
    /// Sent envelopes awaiting acknowledgement, by ID.
    pending: HashMap<String, PendingAck>,
}

struct PendingAck {
    envelope: Envelope,
    sent_at: Instant,
}

impl Session {
    /// Start a session over `transport`.
    ///
    /// Spawns the read and write loops and the one-shot backlog sync, so it
    /// must be called from within a tokio runtime.
    pub fn spawn<T: Transport>(
        recipient: impl Into<String>,
        generation: u64,
        transport: T,
        queue: Arc<dyn OfflineQueue>,
        config: SessionConfig,
    ) -> Session {
        let (tx, rx) = mpsc::channel(config.outbound_capacity.max(1));
        let inner = Arc::new(SessionInner {
            recipient: recipient.into(),
            generation,
            config,
            queue,
            state: Mutex::new(SessionState {
                outbound: Some(tx),
                pending: HashMap::new(),
            }),
            requeue: Mutex::new(()),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            flushed: CancellationToken::new(),
        });

        let (reader, writer) = transport.split();
        tokio::spawn(write_loop(Arc::clone(&inner), writer, rx));
        tokio::spawn(read_loop(Arc::clone(&inner), reader));

        let sync = Arc::clone(&inner);
        tokio::spawn(async move { sync.sync_backlog() });

        debug!(recipient = %inner.recipient, generation, "session started");
        Session { inner }
    }

    /// The recipient this session delivers to.
    pub fn recipient(&self) -> &str {
        &self.inner.recipient
    }

    /// Registry-assigned generation, unique per registration.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    /// Hand an envelope to the session without blocking.
    ///
    /// A closed session or a full outbound channel persists the envelope to
    /// the offline queue instead; the only error is a failed queue write.
    pub fn send(&self, envelope: Envelope) -> parley_core::Result<Delivery> {
        self.inner.send(envelope)
    }

    /// Close the session, flushing pending envelopes to the offline queue.
    ///
    /// Idempotent.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Resolves once the session is closed, for whatever reason, and its
    /// pending envelopes have reached the offline queue.
    pub async fn closed(&self) {
        self.inner.flushed.cancelled().await;
    }

    /// Move every pending envelope older than the read timeout to the
    /// offline queue. Returns how many entries expired.
    ///
    /// Sync envelopes never expire: their batch is already queued and the
    /// pending entry is what lets a late acknowledgement purge it.
    pub fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }

    /// Number of envelopes awaiting acknowledgement.
    pub fn pending_count(&self) -> usize {
        self.inner.state().pending.len()
    }

    /// Whether the envelope ID is awaiting acknowledgement.
    pub fn is_pending(&self, id: &str) -> bool {
        self.inner.state().pending.contains_key(id)
    }
}

impl SessionInner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn requeue(&self) -> MutexGuard<'_, ()> {
        self.requeue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, envelope: Envelope) -> parley_core::Result<Delivery> {
        if envelope.is_acknowledgement() {
            warn!(recipient = %self.recipient, id = %envelope.id, "refusing to relay an acknowledgement");
            return Ok(Delivery::Discarded);
        }

        let mut state = self.state();
        let Some(outbound) = state.outbound.as_ref() else {
            drop(state);
            self.persist(std::slice::from_ref(&envelope))?;
            return Ok(Delivery::Queued);
        };

        // Pending is recorded under the same lock the ack path takes, so an
        // ack can never be processed before its entry exists.
        match outbound.try_send(envelope.clone()) {
            Ok(()) => {
                state.pending.insert(
                    envelope.id.clone(),
                    PendingAck {
                        envelope,
                        sent_at: Instant::now(),
                    },
                );
                Ok(Delivery::Live)
            }
            Err(TrySendError::Full(envelope)) => {
                drop(state);
                debug!(recipient = %self.recipient, id = %envelope.id, "outbound channel full, queueing");
                self.persist(std::slice::from_ref(&envelope))?;
                Ok(Delivery::Queued)
            }
            Err(TrySendError::Closed(envelope)) => {
                drop(state);
                self.persist(std::slice::from_ref(&envelope))?;
                Ok(Delivery::Queued)
            }
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let _requeue = self.requeue();
        let pending = {
            let mut state = self.state();
            state.outbound = None;
            std::mem::take(&mut state.pending)
        };
        self.shutdown.cancel();

        let mut pending: Vec<PendingAck> = pending.into_values().collect();
        pending.sort_by_key(|p| p.sent_at);
        let envelopes: Vec<Envelope> = pending.into_iter().map(|p| p.envelope).collect();

        if let Err(e) = self.persist(&envelopes) {
            error!(
                recipient = %self.recipient,
                count = envelopes.len(),
                "failed to store pending envelopes on close, they are lost: {}",
                e
            );
        }
        self.flushed.cancel();
        info!(recipient = %self.recipient, generation = self.generation, "session closed");
    }

    /// Store envelopes in the offline queue.
    ///
    /// Sync envelopes are skipped: their contents stay queued until the
    /// batch is acknowledged, and the next connection resends them.
    fn persist(&self, envelopes: &[Envelope]) -> parley_core::Result<()> {
        let storable: Vec<Envelope> = envelopes
            .iter()
            .filter(|e| !matches!(e.category, Category::Sync | Category::Acknowledgement))
            .cloned()
            .collect();
        if storable.is_empty() {
            return Ok(());
        }

        self.queue.store(&self.recipient, &storable)?;
        debug!(recipient = %self.recipient, count = storable.len(), "envelopes queued");
        Ok(())
    }

    fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let read_wait = self.config.read_wait;

        let _requeue = self.requeue();
        let mut expired: Vec<(String, PendingAck)> = {
            let mut state = self.state();
            let ids: Vec<String> = state
                .pending
                .iter()
                .filter(|(_, p)| p.envelope.category != Category::Sync)
                .filter(|(_, p)| now.duration_since(p.sent_at) > read_wait)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| state.pending.remove(&id).map(|p| (id, p)))
                .collect()
        };
        if expired.is_empty() {
            return 0;
        }
        expired.sort_by_key(|(_, p)| p.sent_at);

        let envelopes: Vec<Envelope> = expired.iter().map(|(_, p)| p.envelope.clone()).collect();
        match self.persist(&envelopes) {
            Ok(()) => {
                info!(
                    recipient = %self.recipient,
                    count = expired.len(),
                    "unacknowledged envelopes expired to offline queue"
                );
            }
            Err(e) => {
                error!(recipient = %self.recipient, "failed to store expired envelopes: {}", e);
                // Keep them pending so the next sweep or close retries
                let mut state = self.state();
                if state.outbound.is_some() {
                    state.pending.extend(expired.drain(..));
                }
            }
        }
        envelopes.len()
    }

    fn handle_frame(&self, frame: Frame) {
        let decoded = match &frame {
            Frame::Text(text) => Envelope::from_json(text),
            Frame::Binary(data) => Envelope::from_slice(data),
            _ => return,
        };

        let envelope = match decoded {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(recipient = %self.recipient, "malformed frame skipped: {}", e);
                return;
            }
        };

        if envelope.is_acknowledgement() {
            self.handle_acknowledgement(&envelope.id);
        } else {
            debug!(
                recipient = %self.recipient,
                id = %envelope.id,
                category = %envelope.category,
                "ignoring inbound envelope"
            );
        }
    }

    fn handle_acknowledgement(&self, id: &str) {
        let _requeue = self.requeue();
        let acked = self.state().pending.remove(id);

        let purge = match acked {
            Some(pending) if pending.envelope.category == Category::Sync => {
                match pending.envelope.sync_batch() {
                    Ok(batch) => batch.into_iter().map(|e| e.id).collect(),
                    Err(e) => {
                        error!(recipient = %self.recipient, id, "acknowledged sync batch is unreadable: {}", e);
                        return;
                    }
                }
            }
            Some(_) => {
                debug!(recipient = %self.recipient, id, "envelope acknowledged");
                return;
            }
            // Acknowledged after it expired; drop the queued copy
            None => vec![id.to_string()],
        };

        match self.queue.delete(&self.recipient, &purge) {
            Ok(()) => debug!(recipient = %self.recipient, count = purge.len(), "queued envelopes purged"),
            Err(e) => error!(recipient = %self.recipient, "failed to purge acknowledged envelopes: {}", e),
        }
    }

    /// Push the recipient's offline backlog as a single Sync envelope.
    fn sync_backlog(&self) {
        let backlog = match self.queue.load_all(&self.recipient) {
            Ok(backlog) => backlog,
            Err(e) => {
                error!(recipient = %self.recipient, "failed to load offline backlog: {}", e);
                return;
            }
        };
        if backlog.is_empty() {
            return;
        }

        let count = backlog.len();
        let sync = match Envelope::sync(backlog) {
            Ok(sync) => sync,
            Err(e) => {
                error!(recipient = %self.recipient, "failed to build sync envelope: {}", e);
                return;
            }
        };

        match self.send(sync) {
            Ok(delivery) => info!(recipient = %self.recipient, count, ?delivery, "offline backlog sent"),
            Err(e) => error!(recipient = %self.recipient, "failed to send offline backlog: {}", e),
        }
    }
}

async fn write_with_deadline<W: FrameWriter>(
    writer: &mut W,
    frame: Frame,
    wait: Duration,
) -> TransportResult<()> {
    timeout(wait, writer.write_frame(frame))
        .await
        .map_err(|_| TransportError::DeadlineExceeded("write"))?
}

async fn write_loop<W: FrameWriter>(
    inner: Arc<SessionInner>,
    mut writer: W,
    mut outbound: mpsc::Receiver<Envelope>,
) {
    let period = inner.config.ping_period.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            biased;

            _ = inner.shutdown.cancelled() => {
                if let Ok(Err(e)) = timeout(inner.config.write_wait, writer.close()).await {
                    debug!(recipient = %inner.recipient, "close frame not sent: {}", e);
                }
                break;
            }

            next = outbound.recv() => {
                let Some(envelope) = next else { break };
                let json = match envelope.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        error!(recipient = %inner.recipient, id = %envelope.id, "failed to encode envelope: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write_with_deadline(&mut writer, Frame::Text(json), inner.config.write_wait).await {
                    warn!(recipient = %inner.recipient, "failed to write envelope: {}", e);
                    break;
                }
                debug!(recipient = %inner.recipient, id = %envelope.id, category = %envelope.category, "envelope written");
            }

            _ = ticker.tick() => {
                // A silent peer sends no pongs
                inner.sweep_expired();
                if let Err(e) = write_with_deadline(&mut writer, Frame::Ping(Vec::new()), inner.config.write_wait).await {
                    warn!(recipient = %inner.recipient, "failed to send ping: {}", e);
                    break;
                }
            }
        }
    }

    inner.close();
}

async fn read_loop<R: FrameReader>(inner: Arc<SessionInner>, mut reader: R) {
    let read_wait = inner.config.read_wait;
    let mut deadline = Instant::now() + read_wait;

    loop {
        let result = tokio::select! {
            _ = inner.shutdown.cancelled() => break,
            result = timeout_at(deadline, reader.read_frame()) => result,
        };

        let frame = match result {
            Err(_) => {
                info!(recipient = %inner.recipient, "read deadline exceeded");
                break;
            }
            Ok(Err(e)) => {
                warn!(recipient = %inner.recipient, "read failed: {}", e);
                break;
            }
            Ok(Ok(None)) | Ok(Ok(Some(Frame::Close))) => {
                info!(recipient = %inner.recipient, "peer closed connection");
                break;
            }
            Ok(Ok(Some(frame))) => frame,
        };

        match frame {
            Frame::Pong(_) => {
                deadline = Instant::now() + read_wait;
                inner.sweep_expired();
            }
            Frame::Ping(_) => {
                deadline = Instant::now() + read_wait;
            }
            frame => {
                if let Err(e) = frame.check_limit(inner.config.max_frame_size) {
                    warn!(recipient = %inner.recipient, "closing connection: {}", e);
                    break;
                }
                inner.handle_frame(frame);
            }
        }
    }

    inner.close();
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
