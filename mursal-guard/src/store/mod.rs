//! Sent-key store tiers

pub mod file;
pub mod redis;

use async_trait::async_trait;

use crate::GuardError;

/// A durable set of idempotency keys.
#[async_trait]
pub trait SentKeyStore: Send + Sync {
    /// Whether any of the given keys is recorded.
    async fn contains_any(&self, keys: &[String]) -> Result<bool, GuardError>;

    /// Record all of the given keys.
    async fn insert(&self, keys: &[String]) -> Result<(), GuardError>;

    /// Drop every recorded key.
    async fn clear(&self) -> Result<(), GuardError>;
}
