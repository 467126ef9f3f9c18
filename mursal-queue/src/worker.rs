//! Queue workers
//!
//! One worker per queue, concurrency one: the chat transport is a single
//! shared session and must never be driven in parallel. The worker owns
//! the poll ticker and the requeue bookkeeping; what a job *means* lives
//! in the handler.

use std::{sync::Arc, time::Duration};

use mursal_common::Signal;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::queue::{DelayedQueue, RequeueOutcome};

/// How a handler disposed of a job.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job cannot run yet (transport down); reschedule untouched.
    #[error("job deferred for {delay:?}: {reason}")]
    Defer { reason: String, delay: Duration },

    /// The attempt failed; the queue's retry policy applies.
    #[error("job failed: {0}")]
    Failed(String),

    /// The job is obsolete (guard block, stale precondition); drop it
    /// silently.
    #[error("job discarded: {0}")]
    Discard(String),
}

/// Processes one queue's job payloads.
#[async_trait::async_trait]
pub trait JobHandler<T>: Send + Sync {
    /// Handle one job.
    ///
    /// # Errors
    ///
    /// Returns a [`JobError`] describing whether the job should be
    /// deferred, retried, or dropped.
    async fn handle(&self, payload: &T) -> Result<(), JobError>;
}

/// Single-concurrency worker draining one queue.
pub struct Worker<T, H>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    H: JobHandler<T>,
{
    queue: Arc<DelayedQueue<T>>,
    handler: Arc<H>,
    poll_interval: Duration,
}

impl<T, H> Worker<T, H>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    H: JobHandler<T>,
{
    /// Create a worker for a queue.
    #[must_use]
    pub const fn new(queue: Arc<DelayedQueue<T>>, handler: Arc<H>, poll_interval: Duration) -> Self {
        Self {
            queue,
            handler,
            poll_interval,
        }
    }

    /// Run until shutdown, scanning for due jobs every poll interval.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<Signal>) {
        tracing::debug!(queue = %self.queue.name(), "Queue worker starting");

        let mut timer = tokio::time::interval(self.poll_interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.drain_due().await;
                }
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown | Signal::Finalised) => {
                            tracing::debug!(queue = %self.queue.name(), "Queue worker shutting down");
                            break;
                        }
                        Err(e) => {
                            tracing::error!(queue = %self.queue.name(), "Worker shutdown channel error: {e}");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Dispatch every due job in sequence.
    async fn drain_due(&self) {
        let due = match self.queue.pop_due().await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!(queue = %self.queue.name(), error = %e, "Failed to poll queue");
                return;
            }
        };

        for job in due {
            let job_id = job.id.clone();
            match self.handler.handle(&job.payload).await {
                Ok(()) => {
                    tracing::debug!(queue = %self.queue.name(), job_id = %job_id, "Job completed");
                }
                Err(JobError::Defer { reason, delay }) => {
                    tracing::debug!(
                        queue = %self.queue.name(),
                        job_id = %job_id,
                        reason = %reason,
                        "Job deferred"
                    );
                    if let Err(e) = self.queue.defer(job, delay).await {
                        tracing::error!(
                            queue = %self.queue.name(),
                            job_id = %job_id,
                            error = %e,
                            "Failed to defer job"
                        );
                    }
                }
                Err(JobError::Discard(reason)) => {
                    tracing::debug!(
                        queue = %self.queue.name(),
                        job_id = %job_id,
                        reason = %reason,
                        "Job discarded"
                    );
                }
                Err(JobError::Failed(reason)) => {
                    tracing::warn!(
                        queue = %self.queue.name(),
                        job_id = %job_id,
                        reason = %reason,
                        "Job attempt failed"
                    );
                    match self.queue.retry_or_drop(job).await {
                        Ok(RequeueOutcome::Retried { next_attempt }) => {
                            tracing::debug!(
                                queue = %self.queue.name(),
                                job_id = %job_id,
                                next_attempt,
                                "Job rescheduled"
                            );
                        }
                        Ok(RequeueOutcome::Exhausted) => {}
                        Err(e) => {
                            tracing::error!(
                                queue = %self.queue.name(),
                                job_id = %job_id,
                                error = %e,
                                "Failed to reschedule job"
                            );
                        }
                    }
                }
            }
        }
    }
}
