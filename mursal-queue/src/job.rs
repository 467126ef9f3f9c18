//! Job envelope

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    u64::try_from(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(u64::MAX)
}

/// A queued job: the payload plus scheduling metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope<T> {
    /// Unique job id (ULID, lexicographically creation-ordered).
    pub id: String,
    /// The job payload.
    pub payload: T,
    /// Delivery attempts consumed so far.
    pub attempts: u32,
    /// Earliest dispatch time, milliseconds since the Unix epoch.
    pub not_before_ms: u64,
}

impl<T> JobEnvelope<T> {
    /// Wrap a payload for dispatch after `delay`.
    pub fn new(payload: T, delay: std::time::Duration) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            payload,
            attempts: 0,
            not_before_ms: now_ms().saturating_add(
                u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            ),
        }
    }

    /// Whether the job is ready to dispatch at `now_ms`.
    #[must_use]
    pub const fn is_due(&self, now_ms: u64) -> bool {
        self.not_before_ms <= now_ms
    }
}
