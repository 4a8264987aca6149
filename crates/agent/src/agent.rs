// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side peer agent.
//!
//! The agent keeps one connection to the relay alive:
//! - every received envelope is acknowledged, then handed to the handlers
//!   registered for its category;
//! - an unexpected disconnect switches to `Reconnecting` and redials with
//!   exponential backoff until it succeeds or the agent is closed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parley_core::{Category, Envelope, Frame, FrameReader, FrameWriter, Transport, TransportError};

use crate::backoff::Backoff;
use crate::dialer::{Dialer, WebSocketDialer};
use crate::error::{AgentError, Result};
use crate::state::ConnectionState;

/// Callback for envelopes of one category.
pub type MessageHandler = Arc<dyn Fn(Envelope) + Send + Sync>;

/// Callback for connection state changes.
pub type StateHandler = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Server address; `http(s)://` and `ws(s)://` are accepted.
    pub url: String,
    /// Delay after the first failed reconnection attempt.
    pub initial_backoff: Duration,
    /// Cap on the delay between reconnection attempts.
    pub max_backoff: Duration,
    /// Time allowed to write one frame.
    pub write_wait: Duration,
    /// The connection is considered dead after this long without a frame.
    pub read_wait: Duration,
    /// Ping interval.
    pub ping_period: Duration,
    /// Capacity of the outbound channel.
    pub outbound_capacity: usize,
    /// Largest inbound frame accepted, in bytes.
    pub max_frame_size: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            url: "http://localhost:7890".to_string(),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            write_wait: Duration::from_secs(10),
            read_wait: Duration::from_secs(60),
            ping_period: Duration::from_secs(54),
            outbound_capacity: 256,
            // Sync batches carry the whole backlog
            max_frame_size: 1 << 20,
        }
    }
}

/// Connection to the relay for one user. Cheap to clone.
pub struct Agent<D: Dialer = WebSocketDialer> {
    inner: Arc<AgentInner<D>>,
}

impl<D: Dialer> Clone for Agent<D> {
    fn clone(&self) -> Self {
        Agent {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AgentInner<D: Dialer> {
    config: AgentConfig,
    dialer: D,
    credential: Mutex<String>,
    state: Mutex<ConnectionState>,
    handlers: RwLock<HashMap<Category, Vec<MessageHandler>>>,
    state_handler: RwLock<Option<StateHandler>>,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl Agent<WebSocketDialer> {
    /// Create an agent that dials WebSocket connections.
    pub fn new(config: AgentConfig) -> Self {
        Agent::with_dialer(config, WebSocketDialer::default())
    }
}

impl<D: Dialer> Agent<D> {
    /// Create an agent with a custom dialer.
    pub fn with_dialer(config: AgentConfig, dialer: D) -> Self {
        Agent {
            inner: Arc::new(AgentInner {
                config,
                dialer,
                credential: Mutex::new(String::new()),
                state: Mutex::new(ConnectionState::Disconnected),
                handlers: RwLock::new(HashMap::new()),
                state_handler: RwLock::new(None),
                closed: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Connect to the relay, authenticating with `credential`.
    ///
    /// Handshake failures are returned and leave the agent disconnected, so
    /// `connect` may be retried. Once connected, the agent reconnects on its
    /// own after any unexpected disconnect.
    pub async fn connect(&self, credential: &str) -> Result<()> {
        let inner = &self.inner;
        {
            let mut state = inner.state();
            match *state {
                ConnectionState::Closed => return Err(AgentError::Closed),
                ConnectionState::Disconnected => *state = ConnectionState::Connecting,
                other => return Err(AgentError::AlreadyConnected(other)),
            }
        }
        *inner.credential.lock().unwrap_or_else(PoisonError::into_inner) = credential.to_string();

        let dialed = tokio::select! {
            _ = inner.shutdown.cancelled() => return Err(AgentError::Closed),
            result = inner.dialer.dial(&inner.config.url, credential) => result,
        };
        let transport = match dialed {
            Ok(transport) => transport,
            Err(e) => {
                inner.transition(ConnectionState::Connecting, ConnectionState::Disconnected);
                return Err(e.into());
            }
        };

        if !inner.transition(ConnectionState::Connecting, ConnectionState::Connected) {
            return Err(AgentError::Closed);
        }
        info!("Connected to {}", inner.config.url);

        tokio::spawn(supervise(Arc::clone(inner), transport));
        Ok(())
    }

    /// Close the connection and disable reconnection for good.
    ///
    /// Idempotent.
    pub fn close(&self) {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        *inner.state() = ConnectionState::Closed;
        inner.shutdown.cancel();
        info!("Agent closed");
    }

    /// Register a handler for envelopes of `category`.
    ///
    /// Every handler registered for a category runs once per envelope, each
    /// on its own task.
    pub fn set_message_handler<F>(&self, category: Category, handler: F)
    where
        F: Fn(Envelope) + Send + Sync + 'static,
    {
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(category)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Set the handler notified on `Connected` and `Reconnecting`.
    ///
    /// Runs inline on the connection task, so it should return quickly.
    pub fn set_connection_state_handler<F>(&self, handler: F)
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        *self
            .inner
            .state_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.inner.shutdown.cancelled().await;
    }
}

impl<D: Dialer> AgentInner<D> {
    fn state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn credential(&self) -> String {
        self.credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Move from `from` to `to`, notifying the state handler. Returns false
    /// when the agent was no longer in `from`.
    fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        {
            let mut state = self.state();
            if *state != from {
                return false;
            }
            *state = to;
        }
        debug!("Connection state: {} -> {}", from, to);

        if to.is_reported() {
            let handler = self
                .state_handler
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(handler) = handler {
                handler(to);
            }
        }
        true
    }

    fn dispatch(&self, envelope: Envelope) {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&envelope.category)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!(id = %envelope.id, category = %envelope.category, "No handler for envelope");
            return;
        }
        for handler in handlers {
            let envelope = envelope.clone();
            tokio::spawn(async move { handler(envelope) });
        }
    }

    /// Redial with backoff. Returns `None` once the agent is closed.
    async fn reconnect(&self) -> Option<D::Transport> {
        if !self.transition(ConnectionState::Connected, ConnectionState::Reconnecting) {
            return None;
        }

        let mut backoff = Backoff::new(self.config.initial_backoff, self.config.max_backoff);
        let mut attempt = 0u32;
        loop {
            if self.is_closed() {
                return None;
            }
            attempt = attempt.saturating_add(1);
            debug!(attempt, "Attempting to reconnect");

            let credential = self.credential();
            let dialed = tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                result = self.dialer.dial(&self.config.url, &credential) => result,
            };

            match dialed {
                Ok(transport) => {
                    if !self.transition(ConnectionState::Reconnecting, ConnectionState::Connected) {
                        return None;
                    }
                    info!(attempt, "Reconnected to {}", self.config.url);
                    return Some(transport);
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(attempt, "Reconnection attempt failed: {}, retrying in {:?}", e, delay);
                    tokio::select! {
                        _ = self.shutdown.cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

/// Run connections back to back until the agent is closed.
async fn supervise<D: Dialer>(inner: Arc<AgentInner<D>>, mut transport: D::Transport) {
    loop {
        run_connection(&inner, transport).await;
        if inner.is_closed() {
            break;
        }
        match inner.reconnect().await {
            Some(next) => transport = next,
            None => break,
        }
    }
    debug!("Connection supervisor stopped");
}

/// Drive one connection until it ends or the agent is closed.
async fn run_connection<D: Dialer>(inner: &Arc<AgentInner<D>>, transport: D::Transport) {
    let (reader, writer) = transport.split();
    let (tx, rx) = mpsc::channel(inner.config.outbound_capacity.max(1));
    let conn = inner.shutdown.child_token();

    let writer_task = tokio::spawn(write_loop(
        inner.config.clone(),
        writer,
        rx,
        conn.clone(),
    ));
    read_loop(inner, reader, tx, &conn).await;

    conn.cancel();
    if let Err(e) = writer_task.await {
        warn!("Writer task failed: {}", e);
    }
}

async fn write_with_deadline<W: FrameWriter>(
    writer: &mut W,
    frame: Frame,
    wait: Duration,
) -> std::result::Result<(), TransportError> {
    timeout(wait, writer.write_frame(frame))
        .await
        .map_err(|_| TransportError::DeadlineExceeded("write"))?
}

async fn write_loop<W: FrameWriter>(
    config: AgentConfig,
    mut writer: W,
    mut outbound: mpsc::Receiver<Envelope>,
    conn: CancellationToken,
) {
    let period = config.ping_period.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            biased;

            _ = conn.cancelled() => {
                if let Ok(Err(e)) = timeout(config.write_wait, writer.close()).await {
                    debug!("Close frame not sent: {}", e);
                }
                break;
            }

            next = outbound.recv() => {
                let Some(envelope) = next else { break };
                let json = match envelope.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(id = %envelope.id, "Failed to encode envelope: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write_with_deadline(&mut writer, Frame::Text(json), config.write_wait).await {
                    warn!("Failed to write to server: {}", e);
                    break;
                }
            }

            _ = ticker.tick() => {
                if let Err(e) = write_with_deadline(&mut writer, Frame::Ping(Vec::new()), config.write_wait).await {
                    warn!("Failed to send ping: {}", e);
                    break;
                }
            }
        }
    }

    // Wake the reader so the connection is torn down
    conn.cancel();
}

async fn read_loop<D: Dialer, R: FrameReader>(
    inner: &AgentInner<D>,
    mut reader: R,
    outbound: mpsc::Sender<Envelope>,
    conn: &CancellationToken,
) {
    let read_wait = inner.config.read_wait;
    let mut deadline = Instant::now() + read_wait;

    loop {
        let result = tokio::select! {
            _ = conn.cancelled() => return,
            result = timeout_at(deadline, reader.read_frame()) => result,
        };

        let frame = match result {
            Err(_) => {
                warn!("No frame from server within {:?}", read_wait);
                return;
            }
            Ok(Err(e)) => {
                warn!("Read failed: {}", e);
                return;
            }
            Ok(Ok(None)) | Ok(Ok(Some(Frame::Close))) => {
                info!("Server closed the connection");
                return;
            }
            Ok(Ok(Some(frame))) => frame,
        };
        deadline = Instant::now() + read_wait;

        if let Err(e) = frame.check_limit(inner.config.max_frame_size) {
            warn!("Dropping connection: {}", e);
            return;
        }
        let decoded = match &frame {
            Frame::Text(text) => Envelope::from_json(text),
            Frame::Binary(data) => Envelope::from_slice(data),
            Frame::Ping(_) | Frame::Pong(_) | Frame::Close => continue,
        };

        let envelope = match decoded {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Malformed frame skipped: {}", e);
                continue;
            }
        };
        if envelope.is_acknowledgement() {
            debug!(id = %envelope.id, "Ignoring acknowledgement from server");
            continue;
        }

        let ack = Envelope::acknowledgement(envelope.id.clone());
        tokio::select! {
            _ = conn.cancelled() => return,
            sent = outbound.send(ack) => {
                if sent.is_err() {
                    return;
                }
            }
        }

        debug!(id = %envelope.id, category = %envelope.category, "Envelope received");
        inner.dispatch(envelope);
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
