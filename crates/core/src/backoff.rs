// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capped exponential backoff for reconnect loops

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First delay after a failure
    #[serde(with = "humantime_serde")]
    pub base: Duration,
    /// Upper bound on any delay
    #[serde(with = "humantime_serde")]
    pub max: Duration,
    /// Multiplier applied after each consecutive failure
    pub factor: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: 2,
        }
    }
}

impl BackoffConfig {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            ..Self::default()
        }
    }

    pub fn with_factor(mut self, factor: u32) -> Self {
        self.factor = factor;
        self
    }
}

/// Delay sequence that grows monotonically and never exceeds `max`
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Option<Duration>,
    attempts: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            current: None,
            attempts: 0,
        }
    }

    /// Delay to wait before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let next = match self.current {
            None => self.config.base,
            Some(prev) => prev.saturating_mul(self.config.factor.max(1)),
        }
        .min(self.config.max);

        self.current = Some(next);
        self.attempts = self.attempts.saturating_add(1);
        next
    }

    /// Consecutive failures since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Start over from `base` (after a successful connection)
    pub fn reset(&mut self) {
        self.current = None;
        self.attempts = 0;
    }

    /// Sleep for the next delay. Returns false if `token` was cancelled first.
    pub async fn wait(&mut self, token: &CancellationToken) -> bool {
        let delay = self.next_delay();
        tokio::select! {
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
