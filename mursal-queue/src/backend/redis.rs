//! Redis broker backend
//!
//! Scheduled jobs live in a sorted set scored by their not-before time;
//! claiming a due job is a score-range read followed by a `ZREM`, so a
//! member removed by this worker is dispatched exactly once per claim.
//! Exhausted jobs are parked on a dead-letter list for operator triage.

use std::marker::PhantomData;

use redis::aio::ConnectionManager;
use serde::{Serialize, de::DeserializeOwned};

use crate::{QueueError, backend::JobStore, job::JobEnvelope};

/// Probe a broker: connect and `PING`.
///
/// # Errors
///
/// Returns an error when the broker is unreachable or does not answer.
pub async fn probe(url: &str) -> Result<ConnectionManager, QueueError> {
    let client = redis::Client::open(url)?;
    let conn = ConnectionManager::new(client).await?;

    let mut ping = conn.clone();
    let _: String = redis::cmd("PING").query_async(&mut ping).await?;

    Ok(conn)
}

/// Broker-backed job store for one named queue.
pub struct RedisJobStore<T> {
    conn: ConnectionManager,
    scheduled_key: String,
    dead_key: String,
    _payload: PhantomData<fn() -> T>,
}

impl<T> RedisJobStore<T> {
    /// Bind a store to its queue name.
    #[must_use]
    pub fn new(conn: ConnectionManager, queue_name: &str) -> Self {
        Self {
            conn,
            scheduled_key: format!("mursal:queue:{queue_name}:scheduled"),
            dead_key: format!("mursal:queue:{queue_name}:dead"),
            _payload: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<T> JobStore<T> for RedisJobStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn push(&self, job: JobEnvelope<T>) -> Result<(), QueueError> {
        let member = serde_json::to_string(&job)?;
        let mut conn = self.conn.clone();
        let _: u64 = redis::cmd("ZADD")
            .arg(&self.scheduled_key)
            .arg(job.not_before_ms)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn pop_due(&self, now_ms: u64) -> Result<Vec<JobEnvelope<T>>, QueueError> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(&self.scheduled_key)
            .arg("-inf")
            .arg(now_ms)
            .query_async(&mut conn)
            .await?;

        let mut claimed = Vec::with_capacity(members.len());
        for member in members {
            // ZREM is the claim: another consumer racing on the same key
            // removes the member first and we skip it.
            let removed: u64 = redis::cmd("ZREM")
                .arg(&self.scheduled_key)
                .arg(&member)
                .query_async(&mut conn)
                .await?;
            if removed == 0 {
                continue;
            }

            match serde_json::from_str::<JobEnvelope<T>>(&member) {
                Ok(job) => claimed.push(job),
                Err(e) => {
                    tracing::error!(
                        queue = %self.scheduled_key,
                        error = %e,
                        "Unparseable job claimed, moving to dead letter"
                    );
                    let _: u64 = redis::cmd("LPUSH")
                        .arg(&self.dead_key)
                        .arg(&member)
                        .query_async(&mut conn)
                        .await?;
                }
            }
        }

        Ok(claimed)
    }

    async fn dead_letter(&self, job: JobEnvelope<T>) -> Result<(), QueueError> {
        let member = serde_json::to_string(&job)?;
        let mut conn = self.conn.clone();
        let _: u64 = redis::cmd("LPUSH")
            .arg(&self.dead_key)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        tracing::warn!(
            job_id = %job.id,
            attempts = job.attempts,
            queue = %self.dead_key,
            "Job dead-lettered after final attempt"
        );
        Ok(())
    }

    async fn depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        let depth: u64 = redis::cmd("ZCARD")
            .arg(&self.scheduled_key)
            .query_async(&mut conn)
            .await?;
        Ok(depth)
    }

    async fn dead_count(&self) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        let count: u64 = redis::cmd("LLEN")
            .arg(&self.dead_key)
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }
}
