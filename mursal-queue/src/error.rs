//! Queue error types

use thiserror::Error;

/// Errors from queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Broker unavailable or misbehaving.
    #[error("broker error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A job payload could not be encoded or decoded.
    #[error("job serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
