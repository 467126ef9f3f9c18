//! Guard error types

use thiserror::Error;

/// Errors from the sent-key stores.
///
/// Callers treat these as degradation, not failure: a read error in one
/// tier falls through to the other, and a write error is logged and
/// dropped because the remaining tier still holds the key.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Local file tier could not be read or written.
    #[error("sent-key file error: {0}")]
    Io(#[from] std::io::Error),

    /// The sent-key file held something other than a JSON array of strings.
    #[error("sent-key file malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Redis tier unavailable or misbehaving.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
