//! Queue configuration

use serde::{Deserialize, Serialize};

/// Configuration shared by every queue in the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Redis connection string for the broker backend. Absent or
    /// unreachable selects the in-process fallback for the process
    /// lifetime.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// How often workers scan for due jobs (seconds).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Attempts before a broker-backed job is dead-lettered.
    #[serde(default = "default_broker_max_attempts")]
    pub broker_max_attempts: u32,

    /// Base delay for the broker's exponential retry backoff (seconds).
    #[serde(default = "default_broker_base_retry_secs")]
    pub broker_base_retry_secs: u64,

    /// Fixed retry delay for the in-process fallback (seconds), which
    /// retries a failed job exactly once.
    #[serde(default = "default_fallback_retry_delay_secs")]
    pub fallback_retry_delay_secs: u64,
}

const fn default_poll_interval_secs() -> u64 {
    5
}

const fn default_broker_max_attempts() -> u32 {
    3
}

const fn default_broker_base_retry_secs() -> u64 {
    30
}

const fn default_fallback_retry_delay_secs() -> u64 {
    2
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            poll_interval_secs: default_poll_interval_secs(),
            broker_max_attempts: default_broker_max_attempts(),
            broker_base_retry_secs: default_broker_base_retry_secs(),
            fallback_retry_delay_secs: default_fallback_retry_delay_secs(),
        }
    }
}
