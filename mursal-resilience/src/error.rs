//! Outbound error classification
//!
//! Errors from external collaborators are folded into one closed variant
//! set so retry logic, breaker accounting, and callers all match
//! exhaustively instead of string-sniffing.

use thiserror::Error;

use crate::family::OperationFamily;

/// System-level error codes observed on outbound calls.
///
/// The unit variants mirror the classic socket error names surfaced by
/// upstream SDKs; `HttpStatus` carries a response status verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorCode {
    ConnectionReset,
    ConnectionRefused,
    TimedOut,
    HostNotFound,
    DnsTempFail,
    BrokenPipe,
    ConnectionAborted,
    HttpStatus(u16),
    Other,
}

impl ErrorCode {
    /// Whether an error with this code is worth retrying.
    #[must_use]
    pub const fn is_retriable(self) -> bool {
        match self {
            Self::ConnectionReset
            | Self::ConnectionRefused
            | Self::TimedOut
            | Self::HostNotFound
            | Self::DnsTempFail
            | Self::BrokenPipe
            | Self::ConnectionAborted => true,
            Self::HttpStatus(status) => {
                matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            Self::Other => false,
        }
    }

    /// Stable label used as the `errors_by_code` counter key.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::ConnectionReset => "ECONNRESET".to_string(),
            Self::ConnectionRefused => "ECONNREFUSED".to_string(),
            Self::TimedOut => "ETIMEDOUT".to_string(),
            Self::HostNotFound => "ENOTFOUND".to_string(),
            Self::DnsTempFail => "EAI_AGAIN".to_string(),
            Self::BrokenPipe => "EPIPE".to_string(),
            Self::ConnectionAborted => "ECONNABORTED".to_string(),
            Self::HttpStatus(status) => format!("HTTP_{status}"),
            Self::Other => "OTHER".to_string(),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Failure of an outbound operation, classified for recovery.
#[derive(Debug, Clone, Error)]
pub enum OutboundError {
    /// Network-level failure that may succeed on retry.
    #[error("transient failure [{code}]: {message}")]
    Transient { code: ErrorCode, message: String },

    /// The family's circuit breaker is open; the call was not attempted.
    #[error("circuit open for {family}")]
    CircuitOpen { family: OperationFamily },

    /// The request itself is unusable (bad phone, empty payload).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The chat transport session is not connected.
    #[error("transport not connected")]
    TransportDown,

    /// Definitive rejection; retrying cannot help.
    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl OutboundError {
    /// Convenience constructor for transient errors.
    #[must_use]
    pub fn transient(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Transient {
            code,
            message: message.into(),
        }
    }

    /// Classify an I/O error by its kind.
    #[must_use]
    pub fn from_io(error: &std::io::Error) -> Self {
        use std::io::ErrorKind;

        let code = match error.kind() {
            ErrorKind::ConnectionReset => ErrorCode::ConnectionReset,
            ErrorKind::ConnectionRefused => ErrorCode::ConnectionRefused,
            ErrorKind::TimedOut => ErrorCode::TimedOut,
            ErrorKind::NotFound => ErrorCode::HostNotFound,
            ErrorKind::BrokenPipe => ErrorCode::BrokenPipe,
            ErrorKind::ConnectionAborted => ErrorCode::ConnectionAborted,
            _ => ErrorCode::Other,
        };
        Self::Transient {
            code,
            message: error.to_string(),
        }
    }

    /// Classify an HTTP response status.
    #[must_use]
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Transient {
            code: ErrorCode::HttpStatus(status),
            message: message.into(),
        }
    }

    /// Whether the executor should retry after this error.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Transient { code, .. } => code.is_retriable(),
            Self::CircuitOpen { .. }
            | Self::InvalidInput(_)
            | Self::TransportDown
            | Self::Permanent(_) => false,
        }
    }

    /// The error code, when one applies.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Transient { code, .. } => Some(*code),
            _ => None,
        }
    }
}
