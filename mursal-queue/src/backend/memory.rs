//! In-process fallback backend
//!
//! Jobs live in a vector behind an async lock; the worker's ticker scans
//! for entries whose not-before time has passed. Nothing survives a
//! restart, which is acceptable because the duplicate guard, not the
//! queue, carries the durable at-most-once guarantee.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

use crate::{QueueError, backend::JobStore, job::JobEnvelope};

/// Process-local job store.
#[derive(Debug)]
pub struct MemoryJobStore<T> {
    jobs: RwLock<Vec<JobEnvelope<T>>>,
    dropped: AtomicU64,
}

impl<T> MemoryJobStore<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            jobs: RwLock::const_new(Vec::new()),
            dropped: AtomicU64::new(0),
        }
    }
}

impl<T> Default for MemoryJobStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<T> JobStore<T> for MemoryJobStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn push(&self, job: JobEnvelope<T>) -> Result<(), QueueError> {
        self.jobs.write().await.push(job);
        Ok(())
    }

    async fn pop_due(&self, now_ms: u64) -> Result<Vec<JobEnvelope<T>>, QueueError> {
        let mut jobs = self.jobs.write().await;
        let mut due = Vec::new();
        let mut remaining = Vec::with_capacity(jobs.len());

        for job in jobs.drain(..) {
            if job.is_due(now_ms) {
                due.push(job);
            } else {
                remaining.push(job);
            }
        }
        *jobs = remaining;

        Ok(due)
    }

    async fn dead_letter(&self, job: JobEnvelope<T>) -> Result<(), QueueError> {
        // No dead-letter storage without a broker; the job is dropped and
        // only the count remains for the stats surface.
        self.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(job_id = %job.id, attempts = job.attempts, "Dropping job after final attempt");
        Ok(())
    }

    async fn depth(&self) -> Result<u64, QueueError> {
        Ok(self.jobs.read().await.len() as u64)
    }

    async fn dead_count(&self) -> Result<u64, QueueError> {
        Ok(self.dropped.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use crate::job::now_ms;

    use super::*;

    #[tokio::test]
    async fn test_due_jobs_are_claimed_and_removed() {
        let store = MemoryJobStore::new();
        store
            .push(JobEnvelope::new("now".to_string(), Duration::ZERO))
            .await
            .unwrap();
        store
            .push(JobEnvelope::new("later".to_string(), Duration::from_secs(3600)))
            .await
            .unwrap();

        let due = store.pop_due(now_ms()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].payload, "now");

        // The delayed job stays scheduled; the claimed one is gone.
        assert_eq!(store.depth().await.unwrap(), 1);
        assert!(store.pop_due(now_ms()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delayed_job_becomes_due() {
        let store = MemoryJobStore::new();
        store
            .push(JobEnvelope::new("later".to_string(), Duration::from_secs(3600)))
            .await
            .unwrap();

        let due = store.pop_due(now_ms() + 3_600_001).await.unwrap();
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn test_dead_letter_counts_drops() {
        let store = MemoryJobStore::new();
        store
            .dead_letter(JobEnvelope::new("gone".to_string(), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(store.dead_count().await.unwrap(), 1);
        assert_eq!(store.depth().await.unwrap(), 0);
    }
}
