//! The queue facade
//!
//! `DelayedQueue` hides the backend split: callers enqueue a payload with
//! a delay and never learn whether it landed in redis or process memory.
//! Retry-after-failure policy differs by backend (the broker earns
//! exponential backoff and a dead-letter list; the fallback retries once)
//! and lives here so the worker stays policy-free.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    QueueConfig, QueueError,
    backend::{BackendSelection, JobStore, memory::MemoryJobStore, redis::RedisJobStore},
    job::{JobEnvelope, now_ms},
};

/// Point-in-time queue statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub name: String,
    pub backend: String,
    pub depth: u64,
    pub dead_lettered: u64,
}

/// What the queue decided to do with a failed job.
#[derive(Debug, PartialEq, Eq)]
pub enum RequeueOutcome {
    /// The job was rescheduled for another attempt.
    Retried { next_attempt: u32 },
    /// Attempts exhausted; the job was parked or dropped.
    Exhausted,
}

/// A named delayed-job queue.
pub struct DelayedQueue<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    name: String,
    backend_name: &'static str,
    store: Arc<dyn JobStore<T>>,
    max_attempts: u32,
    broker_backed: bool,
    broker_base_retry: Duration,
    fallback_retry_delay: Duration,
}

impl<T> DelayedQueue<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Bind a queue to the backend selected at startup.
    #[must_use]
    pub fn new(name: impl Into<String>, selection: &BackendSelection, config: &QueueConfig) -> Self {
        let name = name.into();
        let (store, broker_backed): (Arc<dyn JobStore<T>>, bool) = match selection {
            BackendSelection::Broker(conn) => {
                (Arc::new(RedisJobStore::new(conn.clone(), &name)), true)
            }
            BackendSelection::InProcess => (Arc::new(MemoryJobStore::new()), false),
        };

        Self {
            name,
            backend_name: selection.name(),
            store,
            // The fallback's budget is the first try plus one retry.
            max_attempts: if broker_backed {
                config.broker_max_attempts
            } else {
                2
            },
            broker_backed,
            broker_base_retry: Duration::from_secs(config.broker_base_retry_secs),
            fallback_retry_delay: Duration::from_secs(config.fallback_retry_delay_secs),
        }
    }

    /// Queue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schedule a payload for dispatch after `delay`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    pub async fn enqueue(&self, payload: T, delay: Duration) -> Result<(), QueueError> {
        let job = JobEnvelope::new(payload, delay);
        tracing::debug!(
            queue = %self.name,
            job_id = %job.id,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Job enqueued"
        );
        self.store.push(job).await
    }

    /// Claim every job whose delay has elapsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn pop_due(&self) -> Result<Vec<JobEnvelope<T>>, QueueError> {
        self.store.pop_due(now_ms()).await
    }

    /// Reschedule a job untouched, without consuming an attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    pub async fn defer(&self, mut job: JobEnvelope<T>, delay: Duration) -> Result<(), QueueError> {
        job.not_before_ms = now_ms().saturating_add(
            u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        );
        self.store.push(job).await
    }

    /// Apply the backend's retry policy to a job whose handler failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the reschedule or the
    /// dead-letter write.
    pub async fn retry_or_drop(
        &self,
        mut job: JobEnvelope<T>,
    ) -> Result<RequeueOutcome, QueueError> {
        job.attempts += 1;

        if job.attempts >= self.max_attempts {
            self.store.dead_letter(job).await?;
            return Ok(RequeueOutcome::Exhausted);
        }

        let delay = if self.broker_backed {
            let exponent = job.attempts.saturating_sub(1).min(16);
            self.broker_base_retry * 2u32.pow(exponent)
        } else {
            self.fallback_retry_delay
        };

        let next_attempt = job.attempts;
        job.not_before_ms = now_ms().saturating_add(
            u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        );
        self.store.push(job).await?;

        Ok(RequeueOutcome::Retried { next_attempt })
    }

    /// Stats snapshot; backend read failures degrade to zeros.
    pub async fn stats(&self) -> QueueStats {
        QueueStats {
            name: self.name.clone(),
            backend: self.backend_name.to_string(),
            depth: self.store.depth().await.unwrap_or(0),
            dead_lettered: self.store.dead_count().await.unwrap_or(0),
        }
    }
}
