// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for framed duplex connections.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production ([`crate::ws::WsTransport`])
//! - In-memory connections for tests and embedding ([`crate::memory::MemoryTransport`])
//!
//! A transport is split once into a reader half and a writer half so the
//! reader task and the writer task of a connection can run in parallel.
//! Deadlines are applied by the callers around each read and write.

use std::future::Future;
use std::pin::Pin;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// A frame exceeded the configured read limit.
    #[error("frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },

    /// A read or write deadline passed.
    #[error("{0} deadline exceeded")]
    DeadlineExceeded(&'static str),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by transport halves.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single frame on a duplex connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 data frame; carries one JSON envelope.
    Text(String),
    /// Binary data frame; carries one JSON envelope as bytes.
    Binary(Vec<u8>),
    /// Keepalive probe.
    Ping(Vec<u8>),
    /// Keepalive response.
    Pong(Vec<u8>),
    /// Peer is closing the connection.
    Close,
}

impl Frame {
    /// Size of the frame's data in bytes.
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(data) | Frame::Ping(data) | Frame::Pong(data) => data.len(),
            Frame::Close => 0,
        }
    }

    /// Whether the frame carries no data.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks the frame against a read limit.
    pub fn check_limit(&self, limit: usize) -> TransportResult<()> {
        let size = self.len();
        if size > limit {
            return Err(TransportError::FrameTooLarge { size, limit });
        }
        Ok(())
    }
}

/// Receiving half of a transport.
pub trait FrameReader: Send + 'static {
    /// Receive the next frame.
    ///
    /// Returns `None` if the connection is closed.
    fn read_frame(&mut self) -> BoxFuture<'_, TransportResult<Option<Frame>>>;
}

/// Sending half of a transport.
pub trait FrameWriter: Send + 'static {
    /// Send a frame to the peer.
    fn write_frame(&mut self, frame: Frame) -> BoxFuture<'_, TransportResult<()>>;

    /// Send a close frame and shut down the sending half.
    fn close(&mut self) -> BoxFuture<'_, TransportResult<()>>;
}

/// Duplex framed connection.
pub trait Transport: Send + 'static {
    /// Receiving half.
    type Reader: FrameReader;
    /// Sending half.
    type Writer: FrameWriter;

    /// Split into independently owned halves.
    fn split(self) -> (Self::Reader, Self::Writer);
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
