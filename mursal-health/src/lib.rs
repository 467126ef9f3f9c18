//! HTTP liveness and readiness probes
//!
//! A minimal axum server answering `/health/live` and `/health/ready` for
//! container orchestration. Components report readiness through the
//! shared [`HealthChecker`].

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod checker;
pub mod config;
pub mod error;
pub mod server;

pub use checker::{HealthChecker, HealthStatus};
pub use config::HealthConfig;
pub use error::HealthError;
pub use server::HealthServer;
