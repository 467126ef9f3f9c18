//! The automation engine
//!
//! Polls the order book, classifies each row against what was seen
//! before, and turns status transitions into outbound message jobs. The
//! sheet and the chat transport are external collaborators behind traits;
//! everything this crate emits flows through the duplicate guard and the
//! delayed queues.

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod settings;
pub mod sheet;
pub mod stats;
pub mod tracking;
pub mod transport;

pub use config::EngineConfig;
pub use engine::{AutomationEngine, EngineDeps, EngineStatus};
pub use error::EngineError;
pub use handlers::{MessageJobHandler, RejectedOfferJobHandler, ReminderJobHandler};
pub use jobs::{MessageJob, RejectedOfferJob, ReminderJob};
pub use settings::{AutomationSettings, SharedSettings};
pub use sheet::SheetSource;
pub use stats::{CycleSummary, EngineStats, SkipCounters};
pub use transport::{ChatTransport, SendOutcome};
