// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory transport.
//!
//! [`MemoryTransport::pair`] returns two connected ends: every frame written
//! on one end is read, unchanged, on the other. Nothing answers pings
//! automatically, which lets tests decide when a keepalive round-trip
//! happens.

use tokio::sync::mpsc;

use crate::transport::{
    BoxFuture, Frame, FrameReader, FrameWriter, Transport, TransportError, TransportResult,
};

/// One end of an in-memory duplex connection.
pub struct MemoryTransport {
    reader: MemoryReader,
    writer: MemoryWriter,
}

/// Receiving half of a [`MemoryTransport`].
pub struct MemoryReader {
    rx: mpsc::UnboundedReceiver<Frame>,
}

/// Sending half of a [`MemoryTransport`].
pub struct MemoryWriter {
    tx: Option<mpsc::UnboundedSender<Frame>>,
}

impl MemoryTransport {
    /// Create two connected transport ends.
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();

        let a = MemoryTransport {
            reader: MemoryReader { rx: b_rx },
            writer: MemoryWriter { tx: Some(a_tx) },
        };
        let b = MemoryTransport {
            reader: MemoryReader { rx: a_rx },
            writer: MemoryWriter { tx: Some(b_tx) },
        };
        (a, b)
    }
}

impl Transport for MemoryTransport {
    type Reader = MemoryReader;
    type Writer = MemoryWriter;

    fn split(self) -> (MemoryReader, MemoryWriter) {
        (self.reader, self.writer)
    }
}

impl FrameReader for MemoryReader {
    fn read_frame(&mut self) -> BoxFuture<'_, TransportResult<Option<Frame>>> {
        Box::pin(async move { Ok(self.rx.recv().await) })
    }
}

impl FrameWriter for MemoryWriter {
    fn write_frame(&mut self, frame: Frame) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            let tx = self.tx.as_ref().ok_or(TransportError::ConnectionClosed)?;
            tx.send(frame).map_err(|_| TransportError::ConnectionClosed)
        })
    }

    fn close(&mut self) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            if let Some(tx) = self.tx.take() {
                // Peer may already be gone
                let _ = tx.send(Frame::Close);
            }
            Ok(())
        })
    }
}
