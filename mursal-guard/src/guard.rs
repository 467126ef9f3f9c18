//! The two-tier duplicate guard

use dashmap::DashSet;
use mursal_common::MessageKind;
use serde::{Deserialize, Serialize};

use crate::{
    GuardError, derive_keys,
    store::{SentKeyStore, file::FileSentKeyStore, redis::RedisSentKeyStore},
};

/// Guard persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Path of the durable sent-key file.
    #[serde(default = "default_file_path")]
    pub file_path: String,

    /// Redis connection string for the preferred tier. When absent or
    /// unreachable the guard runs on the file tier alone.
    #[serde(default)]
    pub redis_url: Option<String>,
}

fn default_file_path() -> String {
    "./config/sent-messages.json".to_string()
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            file_path: default_file_path(),
            redis_url: None,
        }
    }
}

/// Durable idempotency guard for outbound sends.
///
/// Reads consult an in-process cache, then redis, then the local file; a
/// hit anywhere blocks the send. Writes go to every tier best-effort. The
/// file tier is always written, so a redis outage never loses a key.
pub struct DuplicateGuard {
    cache: DashSet<String>,
    file: FileSentKeyStore,
    redis: Option<RedisSentKeyStore>,
}

impl DuplicateGuard {
    /// Open the guard: load the key file and probe redis once.
    ///
    /// A failed redis probe is logged and the guard starts file-only; it
    /// never prevents startup.
    ///
    /// # Errors
    ///
    /// Returns an error only if the key file exists and is unreadable.
    pub async fn open(config: &GuardConfig) -> Result<Self, GuardError> {
        let file = FileSentKeyStore::open(&config.file_path).await?;

        let redis = match &config.redis_url {
            Some(url) => match RedisSentKeyStore::connect(url).await {
                Ok(store) => Some(store),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Redis tier unreachable, duplicate guard running file-only"
                    );
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            cache: DashSet::new(),
            file,
            redis,
        })
    }

    /// Whether a send for this `(order, kind)` is still allowed.
    ///
    /// Returns `true` iff none of the derived keys is recorded in any
    /// tier. A tier read error falls through to the next tier rather than
    /// blocking the decision.
    pub async fn should_send(
        &self,
        order_id: &str,
        kind: MessageKind,
        phone: Option<&str>,
        name: Option<&str>,
    ) -> bool {
        let keys = derive_keys(order_id, kind, phone, name);

        if keys.iter().any(|key| self.cache.contains(key)) {
            return false;
        }

        if let Some(redis) = &self.redis {
            match redis.contains_any(&keys).await {
                Ok(true) => return false,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Redis lookup failed, falling back to file tier");
                }
            }
        }

        match self.file.contains_any(&keys).await {
            Ok(hit) => !hit,
            Err(e) => {
                tracing::error!(error = %e, "File tier lookup failed");
                // Without a readable file tier the guard cannot prove the
                // send is new; block rather than risk a duplicate.
                false
            }
        }
    }

    /// Record a completed send in every tier.
    ///
    /// Tier write failures are logged, not propagated: the cache plus the
    /// surviving tier still enforce idempotency.
    pub async fn mark_sent(
        &self,
        order_id: &str,
        kind: MessageKind,
        phone: Option<&str>,
        name: Option<&str>,
    ) {
        let keys = derive_keys(order_id, kind, phone, name);
        if keys.is_empty() {
            return;
        }

        for key in &keys {
            self.cache.insert(key.clone());
        }

        if let Err(e) = self.file.insert(&keys).await {
            tracing::error!(error = %e, "Failed to persist sent keys to file tier");
        }

        if let Some(redis) = &self.redis
            && let Err(e) = redis.insert(&keys).await
        {
            tracing::warn!(error = %e, "Failed to persist sent keys to redis tier");
        }
    }

    /// Drop the in-process cache only; durable tiers are untouched.
    pub fn reset_cache(&self) {
        self.cache.clear();
    }

    /// Administrative purge of every tier, durable ones included.
    ///
    /// # Errors
    ///
    /// Returns the first tier error; remaining tiers are still cleared.
    pub async fn clear_durable(&self) -> Result<(), GuardError> {
        self.cache.clear();

        let file_result = self.file.clear().await;

        if let Some(redis) = &self.redis
            && let Err(e) = redis.clear().await
        {
            tracing::warn!(error = %e, "Failed to clear redis tier");
        }

        file_result
    }

    /// Whether the redis tier is attached.
    #[must_use]
    pub const fn has_redis_tier(&self) -> bool {
        self.redis.is_some()
    }

    /// Number of keys in the durable file tier.
    pub async fn durable_len(&self) -> usize {
        self.file.len().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    async fn guard(dir: &tempfile::TempDir) -> DuplicateGuard {
        let config = GuardConfig {
            file_path: dir
                .path()
                .join("sent-messages.json")
                .to_string_lossy()
                .into_owned(),
            redis_url: None,
        };
        DuplicateGuard::open(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_first_send_allowed_then_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let g = guard(&dir).await;

        assert!(
            g.should_send("A-1", MessageKind::NewOrder, Some("201234567890"), Some("سارة"))
                .await
        );

        g.mark_sent("A-1", MessageKind::NewOrder, Some("201234567890"), Some("سارة"))
            .await;

        assert!(
            !g.should_send("A-1", MessageKind::NewOrder, Some("201234567890"), Some("سارة"))
                .await
        );
    }

    #[tokio::test]
    async fn test_any_key_family_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let g = guard(&dir).await;

        g.mark_sent("A-1", MessageKind::NewOrder, Some("201234567890"), Some("سارة"))
            .await;

        // Order id churned, but the phone still matches.
        assert!(
            !g.should_send("B-9", MessageKind::NewOrder, Some("201234567890"), None)
                .await
        );
        // Different phone and id, but the same customer name.
        assert!(
            !g.should_send("C-3", MessageKind::NewOrder, Some("201000000000"), Some("سارة"))
                .await
        );
    }

    #[tokio::test]
    async fn test_kinds_do_not_interfere() {
        let dir = tempfile::tempdir().unwrap();
        let g = guard(&dir).await;

        g.mark_sent("A-1", MessageKind::NewOrder, Some("201234567890"), Some("سارة"))
            .await;

        assert!(
            g.should_send("A-1", MessageKind::Shipped, Some("201234567890"), Some("سارة"))
                .await
        );
    }

    #[tokio::test]
    async fn test_blocks_survive_restart() {
        let dir = tempfile::tempdir().unwrap();

        {
            let g = guard(&dir).await;
            g.mark_sent("A-1", MessageKind::NewOrder, None, None).await;
        }

        let reopened = guard(&dir).await;
        assert!(!reopened.should_send("A-1", MessageKind::NewOrder, None, None).await);
    }

    #[tokio::test]
    async fn test_reset_cache_keeps_durable_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let g = guard(&dir).await;

        g.mark_sent("A-1", MessageKind::NewOrder, None, None).await;
        g.reset_cache();

        assert!(!g.should_send("A-1", MessageKind::NewOrder, None, None).await);
    }

    #[tokio::test]
    async fn test_clear_durable_reopens_sends() {
        let dir = tempfile::tempdir().unwrap();
        let g = guard(&dir).await;

        g.mark_sent("A-1", MessageKind::NewOrder, None, None).await;
        g.clear_durable().await.unwrap();

        assert!(g.should_send("A-1", MessageKind::NewOrder, None, None).await);
        assert_eq!(g.durable_len().await, 0);
    }
}
