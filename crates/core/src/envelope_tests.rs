// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

fn raw(value: serde_json::Value) -> Option<Box<RawValue>> {
    Some(serde_json::value::to_raw_value(&value).unwrap())
}

#[parameterized(
    sync = { Category::Sync, "sync" },
    new_message = { Category::NewMessage, "new_message" },
    new_conversation = { Category::NewConversation, "new_conversation" },
    participant_added = { Category::ParticipantAdded, "participant_added" },
    acknowledgement = { Category::Acknowledgement, "acknowledgement" },
)]
fn category_wire_name(category: Category, expected: &str) {
    assert_eq!(category.as_str(), expected);
    assert_eq!(category.to_string(), expected);
    assert_eq!(expected.parse::<Category>().unwrap(), category);
    assert_eq!(
        serde_json::to_string(&category).unwrap(),
        format!("\"{}\"", expected)
    );
}

#[parameterized(
    unknown = { "gossip" },
    camel_case = { "newMessage" },
    empty = { "" },
)]
fn category_parse_rejects(input: &str) {
    let err = input.parse::<Category>().unwrap_err();
    assert!(matches!(err, Error::InvalidCategory(_)));
}

#[test]
fn envelope_wire_shape() {
    let envelope = Envelope::with_id(
        "m-1",
        Category::NewMessage,
        raw(json!({"content": "hi"})),
    );
    let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
    assert_eq!(
        value,
        json!({"id": "m-1", "category": "new_message", "payload": {"content": "hi"}})
    );
}

#[test]
fn acknowledgement_omits_payload() {
    let ack = Envelope::acknowledgement("m-1");
    assert!(ack.is_acknowledgement());
    assert_eq!(
        ack.to_json().unwrap(),
        r#"{"id":"m-1","category":"acknowledgement"}"#
    );
}

#[test]
fn payload_is_kept_verbatim() {
    let text = r#"{"id":"m-1","category":"new_message","payload":{"b": 2,  "a": [1,2]}}"#;
    let envelope = Envelope::from_json(text).unwrap();
    assert_eq!(envelope.payload_str(), Some(r#"{"b": 2,  "a": [1,2]}"#));
}

#[test]
fn payload_null_is_absent() {
    let envelope =
        Envelope::from_json(r#"{"id":"m-1","category":"acknowledgement","payload":null}"#)
            .unwrap();
    assert!(envelope.payload.is_none());
}

#[test]
fn unknown_category_is_rejected() {
    let result = Envelope::from_json(r#"{"id":"m-1","category":"gossip"}"#);
    assert!(matches!(result, Err(Error::Json(_))));
}

#[test]
fn missing_id_is_rejected() {
    let result = Envelope::from_slice(br#"{"category":"new_message"}"#);
    assert!(result.is_err());
}

#[test]
fn new_generates_distinct_ids() {
    let a = Envelope::new(Category::NewMessage, &json!({"n": 1})).unwrap();
    let b = Envelope::new(Category::NewMessage, &json!({"n": 1})).unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(a.payload_str(), b.payload_str());
}

#[test]
fn payload_as_decodes() {
    #[derive(Deserialize)]
    struct Body {
        content: String,
    }

    let envelope = Envelope::new(Category::NewMessage, &json!({"content": "hello"})).unwrap();
    let body: Body = envelope.payload_as().unwrap();
    assert_eq!(body.content, "hello");
}

#[test]
fn payload_as_without_payload_fails() {
    let ack = Envelope::acknowledgement("m-1");
    let err = ack.payload_as::<serde_json::Value>().unwrap_err();
    assert!(matches!(err, Error::MissingPayload(id) if id == "m-1"));
}

#[test]
fn sync_batch_preserves_order() {
    let m1 = Envelope::with_id("m1", Category::NewMessage, raw(json!({"content": "Hello"})));
    let m2 = Envelope::with_id(
        "m2",
        Category::NewConversation,
        raw(json!({"conversationId": "conv1"})),
    );

    let sync = Envelope::sync(vec![m1.clone(), m2.clone()]).unwrap();
    assert_eq!(sync.category, Category::Sync);

    let parsed = Envelope::from_json(&sync.to_json().unwrap()).unwrap();
    assert_eq!(parsed.sync_batch().unwrap(), vec![m1, m2]);
}

#[test]
fn sync_batch_on_other_category_fails() {
    let envelope = Envelope::with_id("m1", Category::NewMessage, raw(json!({})));
    let err = envelope.sync_batch().unwrap_err();
    assert!(matches!(
        err,
        Error::UnexpectedCategory {
            expected: Category::Sync,
            actual: Category::NewMessage
        }
    ));
}

#[test]
fn equality_compares_payload_text() {
    let a = Envelope::with_id("m1", Category::NewMessage, raw(json!({"a": 1})));
    let b = Envelope::with_id("m1", Category::NewMessage, raw(json!({"a": 1})));
    let c = Envelope::with_id("m1", Category::NewMessage, raw(json!({"a": 2})));
    assert_eq!(a, b);
    assert_ne!(a, c);
}
