//! Engine loop configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing and lifecycle configuration for the polling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between polling cycles.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Delay before the first cycle after the engine starts (seconds).
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,

    /// Reschedule delay after a failed cycle (seconds). Shorter than the
    /// normal interval so an outage is probed without waiting a full tick.
    #[serde(default = "default_failure_retry_secs")]
    pub failure_retry_secs: u64,

    /// Whether the engine begins polling as soon as it is served.
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,

    /// Bounds of the random pause inserted before each transport send
    /// (milliseconds), dampening upstream rate limiting.
    #[serde(default = "default_send_jitter_min_ms")]
    pub send_jitter_min_ms: u64,
    #[serde(default = "default_send_jitter_max_ms")]
    pub send_jitter_max_ms: u64,

    /// How long a job waits before re-checking a disconnected transport
    /// (seconds).
    #[serde(default = "default_transport_down_defer_secs")]
    pub transport_down_defer_secs: u64,
}

const fn default_check_interval_secs() -> u64 {
    30
}

const fn default_startup_delay_secs() -> u64 {
    5
}

const fn default_failure_retry_secs() -> u64 {
    60
}

const fn default_auto_start() -> bool {
    true
}

const fn default_send_jitter_min_ms() -> u64 {
    1000
}

const fn default_send_jitter_max_ms() -> u64 {
    3000
}

const fn default_transport_down_defer_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            startup_delay_secs: default_startup_delay_secs(),
            failure_retry_secs: default_failure_retry_secs(),
            auto_start: default_auto_start(),
            send_jitter_min_ms: default_send_jitter_min_ms(),
            send_jitter_max_ms: default_send_jitter_max_ms(),
            transport_down_defer_secs: default_transport_down_defer_secs(),
        }
    }
}

impl EngineConfig {
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub const fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    pub const fn failure_retry(&self) -> Duration {
        Duration::from_secs(self.failure_retry_secs)
    }

    pub const fn transport_down_defer(&self) -> Duration {
        Duration::from_secs(self.transport_down_defer_secs)
    }
}
