// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    canonical = { "Bearer abc123", Some("abc123") },
    lowercase_scheme = { "bearer abc123", Some("abc123") },
    padded = { "  Bearer   abc123  ", Some("abc123") },
    basic_scheme = { "Basic abc123", None },
    missing_token = { "Bearer ", None },
    no_scheme = { "abc123", None },
    empty = { "", None },
)]
fn parse_bearer_header(header: &str, expected: Option<&str>) {
    assert_eq!(bearer_token(header), expected);
}

#[test]
fn static_tokens_resolve_recipients() {
    let tokens = StaticTokens::new(&[
        Account {
            id: "alice".into(),
            token: "t-alice".into(),
        },
        Account {
            id: "bob".into(),
            token: "t-bob".into(),
        },
    ]);

    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens.authenticate("t-alice").as_deref(), Some("alice"));
    assert_eq!(tokens.authenticate("t-bob").as_deref(), Some("bob"));
    assert_eq!(tokens.authenticate("alice"), None);
    assert_eq!(tokens.authenticate(""), None);
}

#[test]
fn empty_table_rejects_everything() {
    let tokens = StaticTokens::default();
    assert!(tokens.is_empty());
    assert_eq!(tokens.authenticate("anything"), None);
}
