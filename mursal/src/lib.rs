//! mursal — order-driven outbound messaging automation
//!
//! The umbrella crate: wires the engine, guard, queues, resilience
//! wrapper, control socket, and health probes into one long-lived
//! process.

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod adapters;
pub mod control_handler;
pub mod controller;

pub use controller::Mursal;
