// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token authentication for incoming connections.

use std::collections::HashMap;

use crate::config::Account;

/// Resolves a presented credential to the recipient it belongs to.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(&self, token: &str) -> Option<String>;
}

/// Fixed token table loaded from the relay config.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    /// Token to recipient ID.
    tokens: HashMap<String, String>,
}

impl StaticTokens {
    pub fn new(accounts: &[Account]) -> Self {
        StaticTokens {
            tokens: accounts
                .iter()
                .map(|a| (a.token.clone(), a.id.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for StaticTokens {
    fn authenticate(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
