//! Redis tier
//!
//! Keys live in a single redis set so membership checks, inserts, and the
//! administrative purge are each one round trip. The `ConnectionManager`
//! reconnects on its own; callers only see errors while redis is actually
//! down, and the guard degrades to the file tier for their duration.

use redis::aio::ConnectionManager;

use crate::{GuardError, store::SentKeyStore};

const SENT_KEY_SET: &str = "mursal:sent-keys";

/// Redis-backed sent-key store.
#[derive(Clone)]
pub struct RedisSentKeyStore {
    conn: ConnectionManager,
}

impl RedisSentKeyStore {
    /// Connect and verify the server with a `PING`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or does not answer
    /// the ping.
    pub async fn connect(url: &str) -> Result<Self, GuardError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        let mut probe = conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut probe).await?;

        tracing::info!(url, "Connected to redis sent-key store");
        Ok(Self { conn })
    }

    /// Number of recorded keys.
    ///
    /// # Errors
    ///
    /// Returns an error if redis is unreachable.
    pub async fn len(&self) -> Result<u64, GuardError> {
        let mut conn = self.conn.clone();
        let count: u64 = redis::cmd("SCARD")
            .arg(SENT_KEY_SET)
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl SentKeyStore for RedisSentKeyStore {
    async fn contains_any(&self, keys: &[String]) -> Result<bool, GuardError> {
        if keys.is_empty() {
            return Ok(false);
        }

        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SMISMEMBER");
        cmd.arg(SENT_KEY_SET);
        for key in keys {
            cmd.arg(key);
        }
        let hits: Vec<bool> = cmd.query_async(&mut conn).await?;
        Ok(hits.into_iter().any(|hit| hit))
    }

    async fn insert(&self, keys: &[String]) -> Result<(), GuardError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SADD");
        cmd.arg(SENT_KEY_SET);
        for key in keys {
            cmd.arg(key);
        }
        let _: u64 = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), GuardError> {
        let mut conn = self.conn.clone();
        let _: u64 = redis::cmd("DEL")
            .arg(SENT_KEY_SET)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
