// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the transport contract and the in-memory transport.

#![allow(clippy::unwrap_used)]

use super::*;
use crate::memory::MemoryTransport;
use yare::parameterized;

#[parameterized(
    text = { Frame::Text("hello".into()), 5 },
    binary = { Frame::Binary(vec![1, 2, 3]), 3 },
    ping = { Frame::Ping(vec![]), 0 },
    pong = { Frame::Pong(vec![9]), 1 },
    close = { Frame::Close, 0 },
)]
fn frame_len(frame: Frame, expected: usize) {
    assert_eq!(frame.len(), expected);
    assert_eq!(frame.is_empty(), expected == 0);
}

#[test]
fn frame_limit_check() {
    let frame = Frame::Text("x".repeat(513));
    assert!(frame.check_limit(1024).is_ok());

    let err = frame.check_limit(512).unwrap_err();
    assert!(matches!(
        err,
        TransportError::FrameTooLarge {
            size: 513,
            limit: 512
        }
    ));
    assert!(err.to_string().contains("513"));
}

#[tokio::test]
async fn memory_pair_delivers_in_order() {
    let (a, b) = MemoryTransport::pair();
    let (_a_rx, mut a_tx) = a.split();
    let (mut b_rx, _b_tx) = b.split();

    a_tx.write_frame(Frame::Text("one".into())).await.unwrap();
    a_tx.write_frame(Frame::Ping(vec![])).await.unwrap();
    a_tx.write_frame(Frame::Text("two".into())).await.unwrap();

    assert_eq!(b_rx.read_frame().await.unwrap(), Some(Frame::Text("one".into())));
    assert_eq!(b_rx.read_frame().await.unwrap(), Some(Frame::Ping(vec![])));
    assert_eq!(b_rx.read_frame().await.unwrap(), Some(Frame::Text("two".into())));
}

#[tokio::test]
async fn memory_close_sends_close_then_ends() {
    let (a, b) = MemoryTransport::pair();
    let (_a_rx, mut a_tx) = a.split();
    let (mut b_rx, _b_tx) = b.split();

    a_tx.close().await.unwrap();

    assert_eq!(b_rx.read_frame().await.unwrap(), Some(Frame::Close));
    assert_eq!(b_rx.read_frame().await.unwrap(), None);

    let err = a_tx.write_frame(Frame::Text("late".into())).await.unwrap_err();
    assert!(matches!(err, TransportError::ConnectionClosed));
}

#[tokio::test]
async fn memory_write_to_dropped_peer_fails() {
    let (a, b) = MemoryTransport::pair();
    let (_a_rx, mut a_tx) = a.split();
    drop(b);

    let err = a_tx.write_frame(Frame::Text("lost".into())).await.unwrap_err();
    assert!(matches!(err, TransportError::ConnectionClosed));
}
