// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    invalid_category = { Error::InvalidCategory("gossip".into()), "gossip" },
    missing_payload = { Error::MissingPayload("m-1".into()), "m-1" },
    corrupted = { Error::CorruptedData("row 7".into()), "row 7" },
)]
fn error_display_contains(err: Error, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[test]
fn error_invalid_category_lists_valid_values() {
    let msg = Error::InvalidCategory("gossip".into()).to_string();
    assert!(msg.contains("new_message"));
    assert!(msg.contains("acknowledgement"));
}

#[test]
fn error_unexpected_category_display() {
    let err = Error::UnexpectedCategory {
        expected: Category::Sync,
        actual: Category::NewMessage,
    };
    let msg = err.to_string();
    assert!(msg.contains("sync"));
    assert!(msg.contains("new_message"));
}

#[test]
fn error_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Json(_)));
}
