//! Health server errors

use thiserror::Error;

/// Errors from the health probe server.
#[derive(Debug, Error)]
pub enum HealthError {
    /// Binding the listen address failed.
    #[error("failed to bind health server to {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    /// The server loop failed.
    #[error("health server error: {0}")]
    Server(String),
}
