//! Durable send-idempotency guard
//!
//! The guard is the safety net that makes every other component's failure
//! recoverable: whatever the engine or the queues re-emit after a crash,
//! a `(order, message kind)` pair that was delivered once is never
//! delivered again. Persistence is two-tiered: a redis set when a broker
//! is reachable, and a local JSON file that is always written and becomes
//! the source of truth during broker outages.

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod guard;
pub mod keys;
pub mod store;

pub use error::GuardError;
pub use guard::{DuplicateGuard, GuardConfig};
pub use keys::derive_keys;
pub use store::{SentKeyStore, file::FileSentKeyStore, redis::RedisSentKeyStore};
