//! Control protocol for managing a running mursal instance
//!
//! An IPC mechanism over a Unix domain socket covering the engine's admin
//! operations (start, stop, status, trigger, force-process, tracking
//! reset), the resilience surface (stats, reset, health), and queue
//! statistics. The protocol uses bincode with a length prefix.

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod client;
pub mod error;
mod framing;
pub mod protocol;
pub mod server;

pub use client::ControlClient;
pub use error::{ControlError, Result};
pub use protocol::{
    EngineCommand, PROTOCOL_VERSION, QueueCommand, Request, RequestCommand, ResilienceCommand,
    Response, ResponseData, ResponsePayload, SystemCommand, SystemStatus,
};
pub use server::{CommandHandler, ControlServer};

/// Default path for the control socket
pub const DEFAULT_CONTROL_SOCKET: &str = "/tmp/mursal.sock";
