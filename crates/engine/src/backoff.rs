//! Retry policy and exponential backoff for the bootstrap loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configurable retry behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the second attempt, in milliseconds.
    pub min_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Total number of attempts; unlimited when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_delay_ms: 100,
            max_delay_ms: 60_000,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.min_delay_ms))
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Start a fresh backoff sequence.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            next_delay: self.min_delay(),
            max_delay: self.max_delay(),
            attempts: 0,
            max_attempts: self.max_attempts,
        }
    }
}

/// Log level for a failed attempt; louder the longer the service stays unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptSeverity {
    Info,
    Warn,
    Error,
}

impl AttemptSeverity {
    pub fn for_attempt(attempt: u32) -> Self {
        match attempt {
            0 | 1 => Self::Info,
            2..=4 => Self::Warn,
            _ => Self::Error,
        }
    }
}

/// Exponential backoff state: each delay doubles the previous one up to the cap.
#[derive(Debug, Clone)]
pub struct Backoff {
    next_delay: Duration,
    max_delay: Duration,
    attempts: u32,
    max_attempts: Option<u32>,
}

impl Backoff {
    /// Attempts recorded so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a failed attempt.
    ///
    /// Returns the delay to wait before the next attempt, or `None` once the
    /// attempt budget is spent.
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.attempts = self.attempts.saturating_add(1);
        if self.max_attempts.is_some_and(|max| self.attempts >= max) {
            return None;
        }
        let delay = self.next_delay.min(self.max_delay);
        self.next_delay = delay.saturating_mul(2).min(self.max_delay);
        Some(delay)
    }
}
