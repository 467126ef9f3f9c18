//! Network resilience for outbound calls
//!
//! Every external interaction (sheet fetch, message send) goes through the
//! [`ResilienceExecutor`]: retry with exponential backoff and jitter for
//! transient errors, a per-family circuit breaker that fails fast during
//! prolonged outages, and counters feeding the operator-facing health
//! overview.

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod breaker;
pub mod error;
pub mod executor;
pub mod family;
pub mod health;
pub mod retry;
pub mod stats;

pub use breaker::{BreakerConfig, BreakerState, CircuitBreaker};
pub use error::{ErrorCode, OutboundError};
pub use executor::ResilienceExecutor;
pub use family::OperationFamily;
pub use health::{ComponentStatus, HealthOverview};
pub use retry::RetryPolicy;
pub use stats::{FamilyStats, StatsOverview};
