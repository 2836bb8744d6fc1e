// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Exponential backoff for broker reconnect campaigns.
//!
//! Intervals grow from `initial_interval` by `multiplier` and are capped at
//! `max_interval`. A campaign stops handing out intervals once
//! `max_elapsed_time` has passed since [`BackoffPolicy::start`].

use std::time::Duration;
use tokio::time::Instant;

use crate::domain::node_config::ReconnectConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_elapsed_time: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for BackoffPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            initial_interval: config.initial_interval,
            multiplier: config.multiplier,
            max_interval: config.max_interval,
            max_elapsed_time: config.max_elapsed_time,
        }
    }
}

impl BackoffPolicy {
    /// Interval to wait before retry number `attempt` (0-based)
    pub fn interval_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(i32::MAX as u32) as i32);
        let scaled = self.initial_interval.as_secs_f64() * factor;
        let capped = scaled.min(self.max_interval.as_secs_f64());
        if capped.is_finite() {
            Duration::from_secs_f64(capped.max(0.0))
        } else {
            self.max_interval
        }
    }

    /// Begin a new campaign; the elapsed-time budget starts now
    pub fn start(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            policy: *self,
            attempt: 0,
            started: Instant::now(),
        }
    }
}

/// Running state of one reconnect campaign
#[derive(Debug)]
pub struct ExponentialBackoff {
    policy: BackoffPolicy,
    attempt: u32,
    started: Instant,
}

impl ExponentialBackoff {
    /// Next interval to sleep, or `None` when the campaign is exhausted
    pub fn next_backoff(&mut self) -> Option<Duration> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.policy.max_elapsed_time {
            return None;
        }

        let interval = self.policy.interval_for_attempt(self.attempt);
        self.attempt = self.attempt.saturating_add(1);

        // Never sleep past the campaign deadline
        Some(interval.min(self.policy.max_elapsed_time - elapsed))
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
