//! Error types for control operations

use thiserror::Error;

/// Errors that can occur during control operations
#[derive(Debug, Error)]
pub enum ControlError {
    /// I/O error on the control socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame's payload could not be decoded
    #[error("malformed frame: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// A value could not be encoded into a frame
    #[error("frame encoding failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// A peer announced a frame beyond the size limit
    #[error("oversized frame: {size} bytes (limit {limit})")]
    FrameTooLarge { size: u32, limit: u32 },

    /// Server rejected or failed the command
    #[error("server error: {0}")]
    ServerError(String),

    /// The peer hung up mid-exchange
    #[error("connection closed")]
    ConnectionClosed,

    /// The exchange did not complete in time
    #[error("request timeout")]
    Timeout,
}

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;
