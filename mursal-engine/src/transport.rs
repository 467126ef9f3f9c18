//! Chat transport

use async_trait::async_trait;
use mursal_common::CanonicalPhone;
use mursal_resilience::OutboundError;

/// Result of a delivered send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The transport acknowledged delivery.
    Delivered,
    /// The transport neither confirmed nor denied; the message may or may
    /// not have reached the customer. The guard is not marked for these.
    Ambiguous,
}

/// The single upstream chat session.
///
/// The session is a shared, serial resource: callers obtain it one send
/// at a time, and the queue workers' concurrency of one enforces that.
/// Session lifecycle (pairing, reconnects) belongs to the implementation.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Whether the session is currently connected and able to deliver.
    async fn is_connected(&self) -> bool;

    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Returns a classified [`OutboundError`]; transient codes are
    /// retried by the resilience wrapper.
    async fn send(&self, phone: &CanonicalPhone, body: &str) -> Result<SendOutcome, OutboundError>;
}
