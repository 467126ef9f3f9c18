//! Command-line utility for managing a running mursal instance
//!
//! Talks to the control socket to:
//! - Start, stop, and inspect the automation engine
//! - Trigger or force a processing cycle
//! - Reset tracking state
//! - Read resilience statistics and the health overview
//! - Read queue statistics

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

use clap::{Parser, Subcommand};
use mursal_control::{
    ControlClient, DEFAULT_CONTROL_SOCKET, EngineCommand, QueueCommand, Request, RequestCommand,
    ResilienceCommand, Response, ResponseData, ResponsePayload, SystemCommand,
};

/// Command-line utility for managing the mursal service
#[derive(Parser, Debug)]
#[command(name = "mursalctl")]
#[command(about = "Manage the mursal messaging automation service", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the control socket
    #[arg(short = 'c', long, default_value = DEFAULT_CONTROL_SOCKET)]
    control_socket: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Automation engine control
    Engine {
        #[command(subcommand)]
        action: EngineAction,
    },
    /// Resilience wrapper statistics and health
    Resilience {
        #[command(subcommand)]
        action: ResilienceAction,
    },
    /// Queue statistics
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
    /// System status and health
    System {
        #[command(subcommand)]
        action: SystemAction,
    },
}

#[derive(Subcommand, Debug)]
enum EngineAction {
    /// Begin polling (idempotent)
    Start,
    /// Halt polling at the next loop boundary
    Stop,
    /// Show the engine status snapshot
    Status,
    /// Run one processing cycle now
    Trigger,
    /// Run one cycle treating all new-order rows as fireable
    ForceProcess,
    /// Purge observation history and in-process caches
    ResetTracking {
        /// Also clear the durable sent-key set
        #[arg(long)]
        purge_durable: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ResilienceAction {
    /// Show retry and error counters per operation family
    Stats,
    /// Zero the counters
    ResetStats,
    /// Show the aggregated health overview
    Health,
}

#[derive(Subcommand, Debug)]
enum QueueAction {
    /// Show depth and dead-letter counts for every queue
    Stats,
}

#[derive(Subcommand, Debug)]
enum SystemAction {
    /// Check if the service is responding
    Ping,
    /// Show process-level status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Engine { action } => RequestCommand::Engine(match action {
            EngineAction::Start => EngineCommand::Start,
            EngineAction::Stop => EngineCommand::Stop,
            EngineAction::Status => EngineCommand::Status,
            EngineAction::Trigger => EngineCommand::TriggerOnce,
            EngineAction::ForceProcess => EngineCommand::ForceProcessNewOrders,
            EngineAction::ResetTracking { purge_durable } => {
                EngineCommand::ResetTracking { purge_durable }
            }
        }),
        Commands::Resilience { action } => RequestCommand::Resilience(match action {
            ResilienceAction::Stats => ResilienceCommand::Stats,
            ResilienceAction::ResetStats => ResilienceCommand::ResetStats,
            ResilienceAction::Health => ResilienceCommand::Health,
        }),
        Commands::Queue { action } => RequestCommand::Queue(match action {
            QueueAction::Stats => QueueCommand::Stats,
        }),
        Commands::System { action } => RequestCommand::System(match action {
            SystemAction::Ping => SystemCommand::Ping,
            SystemAction::Status => SystemCommand::Status,
        }),
    };

    let client = ControlClient::new(cli.control_socket);
    let response = client.send_request(Request::new(command)).await?;

    print_response(&response)
}

fn print_response(response: &Response) -> anyhow::Result<()> {
    match &response.payload {
        ResponsePayload::Ok => {
            println!("ok");
            Ok(())
        }
        ResponsePayload::Error(message) => {
            anyhow::bail!("server error: {message}");
        }
        ResponsePayload::Data(data) => {
            match data.as_ref() {
                ResponseData::Message(message) => println!("{message}"),
                ResponseData::EngineStatus(status) => {
                    println!("{}", serde_json::to_string_pretty(status)?);
                }
                ResponseData::CycleSummary(summary) => {
                    println!("{}", serde_json::to_string_pretty(summary)?);
                }
                ResponseData::ResilienceStats(stats) => {
                    println!("{}", serde_json::to_string_pretty(stats)?);
                }
                ResponseData::Health(health) => {
                    println!("{}", serde_json::to_string_pretty(health)?);
                }
                ResponseData::QueueStats(stats) => {
                    println!("{}", serde_json::to_string_pretty(stats)?);
                }
                ResponseData::SystemStatus(status) => {
                    println!("{}", serde_json::to_string_pretty(status)?);
                }
            }
            Ok(())
        }
    }
}
