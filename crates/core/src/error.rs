// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for parley-core operations.

use thiserror::Error;

use crate::envelope::Category;

/// All possible errors that can occur in parley-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid category: '{0}'\n  hint: valid categories are: sync, new_message, new_conversation, participant_added, acknowledgement")]
    InvalidCategory(String),

    #[error("unexpected category: expected {expected}, got {actual}")]
    UnexpectedCategory { expected: Category, actual: Category },

    #[error("envelope {0} has no payload")]
    MissingPayload(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for parley-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
