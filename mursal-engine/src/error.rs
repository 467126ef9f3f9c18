//! Engine error types

use thiserror::Error;

/// Errors surfaced by the automation engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The order-book snapshot could not be fetched; the cycle aborts and
    /// reschedules on the failure interval.
    #[error("snapshot fetch failed: {0}")]
    SnapshotFetch(#[from] mursal_resilience::OutboundError),

    /// A job could not be enqueued.
    #[error("queue error: {0}")]
    Queue(#[from] mursal_queue::QueueError),

    /// A triggered cycle failed; the message carries the cause.
    #[error("cycle failed: {0}")]
    CycleFailed(String),

    /// The engine loop is gone; commands can no longer be delivered.
    #[error("engine command channel closed")]
    ChannelClosed,

    /// `serve` was called a second time on the same engine.
    #[error("engine loop already running")]
    AlreadyServing,
}
