// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Per-process sequence mixed into every generated ID.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh envelope ID.
/// Format: {unix_ms}-{hash} where hash is the first 12 hex chars of
/// SHA256(timestamp + pid + sequence).
pub fn generate_envelope_id() -> String {
    generate_envelope_id_at(&Utc::now())
}

/// Generate an envelope ID for the given instant.
pub fn generate_envelope_id_at(now: &DateTime<Utc>) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let input = format!("{}:{}:{}", now.to_rfc3339(), std::process::id(), seq);
    let hash = Sha256::digest(input.as_bytes());
    format!("{}-{}", now.timestamp_millis(), hex::encode(&hash[..6]))
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
