//! Control protocol types and serialization

use mursal_engine::{CycleSummary, EngineStatus};
use mursal_queue::QueueStats;
use mursal_resilience::{HealthOverview, StatsOverview};
use serde::{Deserialize, Serialize};

/// Current protocol version
pub const PROTOCOL_VERSION: u32 = 1;

/// Request sent to the control server (versioned wrapper)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Protocol version
    pub version: u32,
    /// The actual command to execute
    pub command: RequestCommand,
}

impl Request {
    /// Wrap a command at the current protocol version.
    #[must_use]
    pub const fn new(command: RequestCommand) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            command,
        }
    }

    /// Whether the server can process this request's version.
    #[must_use]
    pub const fn is_version_compatible(&self) -> bool {
        self.version == PROTOCOL_VERSION
    }
}

/// Request command types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RequestCommand {
    /// Automation engine commands
    Engine(EngineCommand),
    /// Resilience wrapper commands
    Resilience(ResilienceCommand),
    /// Queue commands
    Queue(QueueCommand),
    /// System management commands
    System(SystemCommand),
}

/// Automation engine commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineCommand {
    /// Begin polling (idempotent)
    Start,
    /// Halt polling at the next loop boundary
    Stop,
    /// Engine status snapshot
    Status,
    /// Run one cycle now
    TriggerOnce,
    /// Run one cycle treating all new-order rows as fireable
    ForceProcessNewOrders,
    /// Purge observation history and in-process caches
    ResetTracking {
        /// Also clear the durable sent-key set
        purge_durable: bool,
    },
}

/// Resilience wrapper commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResilienceCommand {
    /// Retry and error counters per operation family
    Stats,
    /// Zero the counters (breaker state untouched)
    ResetStats,
    /// The aggregated health overview
    Health,
}

/// Queue commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueueCommand {
    /// Depth and dead-letter counts for every queue
    Stats,
}

/// System management commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SystemCommand {
    /// Health check / ping
    Ping,
    /// Process-level status
    Status,
}

/// Response from the control server (versioned wrapper)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Protocol version
    pub version: u32,
    /// The actual response payload
    pub payload: ResponsePayload,
}

impl Response {
    /// Command succeeded with no data.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload: ResponsePayload::Ok,
        }
    }

    /// Command succeeded with data.
    #[must_use]
    pub fn data(data: ResponseData) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload: ResponsePayload::Data(Box::new(data)),
        }
    }

    /// Command failed.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload: ResponsePayload::Error(message.into()),
        }
    }
}

/// Response payload types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponsePayload {
    /// Command succeeded
    Ok,
    /// Command succeeded with data
    Data(Box<ResponseData>),
    /// Command failed with error message
    Error(String),
}

/// Response data types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponseData {
    /// Engine status snapshot
    EngineStatus(EngineStatus),
    /// Outcome of a triggered cycle
    CycleSummary(CycleSummary),
    /// Resilience counters
    ResilienceStats(StatsOverview),
    /// Aggregated health overview
    Health(HealthOverview),
    /// Per-queue statistics
    QueueStats(Vec<QueueStats>),
    /// Process-level status
    SystemStatus(SystemStatus),
    /// Simple string message
    Message(String),
}

/// Process-level status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Server version
    pub version: String,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Selected queue backend
    pub queue_backend: String,
    /// Whether the engine loop is polling
    pub engine_running: bool,
    /// Whether the chat transport reports connected
    pub transport_connected: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn roundtrip(request: Request) -> Request {
        let bytes = bincode::serde::encode_to_vec(request, bincode::config::legacy())
            .expect("encode request");
        let (decoded, _): (Request, _) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::legacy())
                .expect("decode request");
        decoded
    }

    #[test]
    fn test_engine_command_roundtrip() {
        let decoded = roundtrip(Request::new(RequestCommand::Engine(
            EngineCommand::ResetTracking {
                purge_durable: true,
            },
        )));

        assert!(decoded.is_version_compatible());
        match decoded.command {
            RequestCommand::Engine(EngineCommand::ResetTracking { purge_durable }) => {
                assert!(purge_durable);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_response_roundtrip() {
        let response = Response::data(ResponseData::SystemStatus(SystemStatus {
            version: "0.1.0".to_string(),
            uptime_secs: 42,
            queue_backend: "in-process".to_string(),
            engine_running: true,
            transport_connected: false,
        }));

        let bytes = bincode::serde::encode_to_vec(&response, bincode::config::legacy())
            .expect("encode response");
        let (decoded, _): (Response, _) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::legacy())
                .expect("decode response");

        match decoded.payload {
            ResponsePayload::Data(data) => match *data {
                ResponseData::SystemStatus(status) => {
                    assert_eq!(status.uptime_secs, 42);
                    assert!(status.engine_running);
                }
                other => panic!("unexpected data: {other:?}"),
            },
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_error_response() {
        let response = Response::error("engine loop gone");
        match response.payload {
            ResponsePayload::Error(message) => assert_eq!(message, "engine loop gone"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
