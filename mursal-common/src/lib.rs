//! Shared types and plumbing for the mursal messaging automation service

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod logging;
pub mod message;
pub mod order;
pub mod phone;
pub mod template;

pub use message::{EnabledKinds, MessageKind};
pub use order::OrderRow;
pub use phone::CanonicalPhone;
pub use template::{TemplateContext, TemplateSet};
pub use tracing;

/// Broadcast signal used to coordinate shutdown across subsystems.
#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Shutdown,
    Finalised,
}

/// Seconds since the Unix epoch, saturating to zero on clock skew.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
