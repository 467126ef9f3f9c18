//! Retry policy with exponential backoff and jitter

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::family::OperationFamily;

/// Retry configuration for one operation family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds).
    ///
    /// The delay before attempt `n + 1` is
    /// `min(max_delay, base * 2^(n - 1)) * (1 ± jitter)`.
    #[serde(default = "defaults::base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff ceiling (milliseconds).
    #[serde(default = "defaults::max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter factor randomizing each delay within ±this fraction.
    #[serde(default = "defaults::jitter_factor")]
    pub jitter_factor: f64,

    /// Per-attempt timeout (seconds). `None` leaves the call unbounded.
    #[serde(default)]
    pub attempt_timeout_secs: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: defaults::max_retries(),
            base_delay_ms: defaults::base_delay_ms(),
            max_delay_ms: defaults::max_delay_ms(),
            jitter_factor: defaults::jitter_factor(),
            attempt_timeout_secs: None,
        }
    }
}

impl RetryPolicy {
    /// The tuned policy for an operation family.
    ///
    /// Sheet reads are cheap and frequent, so they retry more with short
    /// waits; transport sends are slow and rate-limited upstream, so they
    /// retry less with longer waits.
    #[must_use]
    pub const fn for_family(family: OperationFamily) -> Self {
        match family {
            OperationFamily::SheetRead => Self {
                max_retries: 3,
                base_delay_ms: 2000,
                max_delay_ms: 10_000,
                jitter_factor: defaults::jitter_factor(),
                attempt_timeout_secs: Some(10),
            },
            OperationFamily::MessageSend => Self {
                max_retries: 2,
                base_delay_ms: 3000,
                max_delay_ms: 15_000,
                jitter_factor: defaults::jitter_factor(),
                attempt_timeout_secs: Some(30),
            },
        }
    }

    /// Whether another attempt is allowed after `attempts` have completed.
    #[must_use]
    pub const fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_retries
    }

    /// The backoff delay after attempt number `attempt` (1-indexed).
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let delay_ms = if exponent >= 63 {
            self.max_delay_ms
        } else {
            self.base_delay_ms
                .saturating_mul(1u64 << exponent)
                .min(self.max_delay_ms)
        };

        // Intentional precision loss for randomization
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let jittered = {
            let jitter_range = (delay_ms as f64) * self.jitter_factor;
            if jitter_range > 0.0 {
                let jitter: f64 = rand::rng().random_range(-jitter_range..=jitter_range);
                ((delay_ms as f64) + jitter).max(0.0) as u64
            } else {
                delay_ms
            }
        };

        Duration::from_millis(jittered)
    }

    /// The per-attempt timeout, when configured.
    #[must_use]
    pub const fn attempt_timeout(&self) -> Option<Duration> {
        match self.attempt_timeout_secs {
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        }
    }
}

mod defaults {
    pub const fn max_retries() -> u32 {
        5
    }

    pub const fn base_delay_ms() -> u64 {
        1000
    }

    pub const fn max_delay_ms() -> u64 {
        30_000
    }

    pub const fn jitter_factor() -> f64 {
        0.1
    }
}
