//! Queue backends and startup selection

pub mod memory;
pub mod redis;

use serde::{Serialize, de::DeserializeOwned};

use crate::{QueueConfig, QueueError, job::JobEnvelope};

/// Storage for one queue's scheduled jobs.
#[async_trait::async_trait]
pub trait JobStore<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Store a job for dispatch at its not-before time.
    async fn push(&self, job: JobEnvelope<T>) -> Result<(), QueueError>;

    /// Claim every job due at `now_ms`, removing each from the store.
    async fn pop_due(&self, now_ms: u64) -> Result<Vec<JobEnvelope<T>>, QueueError>;

    /// Park a job that exhausted its attempts.
    async fn dead_letter(&self, job: JobEnvelope<T>) -> Result<(), QueueError>;

    /// Number of scheduled jobs.
    async fn depth(&self) -> Result<u64, QueueError>;

    /// Number of dead-lettered jobs.
    async fn dead_count(&self) -> Result<u64, QueueError>;
}

/// The backend chosen at startup, shared by every queue.
#[derive(Clone)]
pub enum BackendSelection {
    /// Redis broker reachable; delayed jobs survive restarts.
    Broker(::redis::aio::ConnectionManager),
    /// No broker; jobs live in process memory only.
    InProcess,
}

impl BackendSelection {
    /// Backend name for stats and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Broker(_) => "redis",
            Self::InProcess => "in-process",
        }
    }
}

/// Probe the broker once and pick the backend for the process lifetime.
///
/// A missing or unreachable broker is not an error; the fallback keeps
/// the service running with process-local queues.
pub async fn select_backend(config: &QueueConfig) -> BackendSelection {
    let Some(url) = &config.redis_url else {
        tracing::info!("No broker configured, using in-process queues");
        return BackendSelection::InProcess;
    };

    match redis::probe(url).await {
        Ok(conn) => {
            tracing::info!(url, "Broker probe succeeded, using redis queues");
            BackendSelection::Broker(conn)
        }
        Err(e) => {
            tracing::warn!(
                url,
                error = %e,
                "Broker probe failed, falling back to in-process queues"
            );
            BackendSelection::InProcess
        }
    }
}
