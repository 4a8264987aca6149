// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket transport implementation using tokio-tungstenite.
//!
//! Works for both accepted server-side streams and dialed client streams.
//! Pings received from the peer are answered by tungstenite itself; they are
//! still surfaced as [`Frame::Ping`] so readers can treat them as liveness.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

use crate::transport::{
    BoxFuture, Frame, FrameReader, FrameWriter, Transport, TransportError, TransportResult,
};

/// A WebSocket connection over any async byte stream.
pub struct WsTransport<S> {
    stream: WebSocketStream<S>,
}

/// Receiving half of a [`WsTransport`].
pub struct WsReader<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

/// Sending half of a [`WsTransport`].
pub struct WsWriter<S> {
    sink: SplitSink<WebSocketStream<S>, Message>,
}

impl<S> WsTransport<S> {
    /// Wrap an established WebSocket stream.
    pub fn new(stream: WebSocketStream<S>) -> Self {
        WsTransport { stream }
    }
}

impl<S> Transport for WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Reader = WsReader<S>;
    type Writer = WsWriter<S>;

    fn split(self) -> (WsReader<S>, WsWriter<S>) {
        let (sink, stream) = self.stream.split();
        (WsReader { stream }, WsWriter { sink })
    }
}

impl<S> FrameReader for WsReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn read_frame(&mut self) -> BoxFuture<'_, TransportResult<Option<Frame>>> {
        Box::pin(async move {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return Ok(Some(Frame::Text(text.as_str().to_owned())));
                    }
                    Some(Ok(Message::Binary(data))) => return Ok(Some(Frame::Binary(data.to_vec()))),
                    Some(Ok(Message::Ping(data))) => return Ok(Some(Frame::Ping(data.to_vec()))),
                    Some(Ok(Message::Pong(data))) => return Ok(Some(Frame::Pong(data.to_vec()))),
                    Some(Ok(Message::Close(_))) => return Ok(Some(Frame::Close)),
                    Some(Ok(Message::Frame(_))) => {
                        // Raw frames are never yielded while reading
                        continue;
                    }
                    Some(Err(tungstenite::Error::ConnectionClosed))
                    | Some(Err(tungstenite::Error::AlreadyClosed))
                    | None => return Ok(None),
                    Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
                }
            }
        })
    }
}

impl<S> FrameWriter for WsWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn write_frame(&mut self, frame: Frame) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            let message = match frame {
                Frame::Text(text) => Message::Text(text.into()),
                Frame::Binary(data) => Message::Binary(data.into()),
                Frame::Ping(data) => Message::Ping(data.into()),
                Frame::Pong(data) => Message::Pong(data.into()),
                Frame::Close => Message::Close(None),
            };

            self.sink
                .send(message)
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            match self.sink.close().await {
                Ok(()) => Ok(()),
                Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                    Ok(())
                }
                Err(e) => Err(TransportError::SendFailed(e.to_string())),
            }
        })
    }
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
