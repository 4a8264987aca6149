// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff for reconnection attempts.

use std::time::Duration;

/// Doubling delay, capped at a maximum.
#[derive(Debug, Clone)]
pub struct Backoff {
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Backoff {
            max,
            current: initial.min(max),
        }
    }

    /// Delay to wait before the next attempt. Each call doubles the
    /// following delay until it reaches the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
