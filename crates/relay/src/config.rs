// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Relay configuration.
//!
//! Read from an optional TOML file:
//! - `[session]`: session timing and sizing, in milliseconds and bytes
//! - `[[accounts]]`: recipient IDs and the bearer tokens they connect with
//!
//! Every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::session::SessionConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

/// The `[session]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSettings {
    /// Time allowed to write one frame (default: 10000).
    #[serde(default = "default_write_wait_ms")]
    pub write_wait_ms: u64,
    /// Read timeout, also the acknowledgement timeout (default: 60000).
    #[serde(default = "default_read_wait_ms")]
    pub read_wait_ms: u64,
    /// Ping interval, shorter than the read timeout (default: 54000).
    #[serde(default = "default_ping_period_ms")]
    pub ping_period_ms: u64,
    /// Outbound channel capacity per session (default: 256).
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
    /// Largest inbound frame in bytes (default: 512).
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

fn default_write_wait_ms() -> u64 {
    10_000
}

fn default_read_wait_ms() -> u64 {
    60_000
}

fn default_ping_period_ms() -> u64 {
    // 9/10 of the read timeout
    54_000
}

fn default_outbound_capacity() -> usize {
    256
}

fn default_max_frame_size() -> usize {
    512
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            write_wait_ms: default_write_wait_ms(),
            read_wait_ms: default_read_wait_ms(),
            ping_period_ms: default_ping_period_ms(),
            outbound_capacity: default_outbound_capacity(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

/// A recipient allowed to connect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Recipient ID sessions are registered under.
    pub id: String,
    /// Bearer token presented in the `Authorization` header.
    pub token: String,
}

impl RelayConfig {
    /// Load and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate TOML config text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: RelayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.session;
        if s.ping_period_ms == 0 || s.read_wait_ms == 0 || s.write_wait_ms == 0 {
            return Err(ConfigError::Invalid(
                "session timings must be greater than zero".to_string(),
            ));
        }
        if s.ping_period_ms >= s.read_wait_ms {
            return Err(ConfigError::Invalid(format!(
                "ping_period_ms ({}) must be shorter than read_wait_ms ({})",
                s.ping_period_ms, s.read_wait_ms
            )));
        }
        if s.outbound_capacity == 0 {
            return Err(ConfigError::Invalid(
                "outbound_capacity must be at least 1".to_string(),
            ));
        }
        if s.max_frame_size == 0 {
            return Err(ConfigError::Invalid(
                "max_frame_size must be at least 1".to_string(),
            ));
        }

        for account in &self.accounts {
            if account.id.is_empty() || account.token.is_empty() {
                return Err(ConfigError::Invalid(
                    "accounts need a non-empty id and token".to_string(),
                ));
            }
        }
        for (i, account) in self.accounts.iter().enumerate() {
            if self.accounts[..i].iter().any(|a| a.token == account.token) {
                return Err(ConfigError::Invalid(format!(
                    "account '{}' reuses another account's token",
                    account.id
                )));
            }
        }
        Ok(())
    }

    /// Session settings as durations.
    pub fn session_config(&self) -> SessionConfig {
        let s = &self.session;
        SessionConfig {
            write_wait: Duration::from_millis(s.write_wait_ms),
            read_wait: Duration::from_millis(s.read_wait_ms),
            ping_period: Duration::from_millis(s.ping_period_ms),
            outbound_capacity: s.outbound_capacity,
            max_frame_size: s.max_frame_size,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
