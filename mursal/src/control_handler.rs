//! Control handler wiring the socket protocol to the running service

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use mursal_control::{
    CommandHandler, ControlError, EngineCommand, QueueCommand, Request, RequestCommand,
    ResilienceCommand, Response, ResponseData, SystemCommand, SystemStatus,
};
use mursal_engine::{
    AutomationEngine, ChatTransport, MessageJob, RejectedOfferJob, ReminderJob,
};
use mursal_queue::DelayedQueue;
use mursal_resilience::ResilienceExecutor;

/// Handler for control commands against the live service.
pub struct MursalControlHandler {
    engine: Arc<AutomationEngine>,
    resilience: Arc<ResilienceExecutor>,
    transport: Arc<dyn ChatTransport>,
    messages: Arc<DelayedQueue<MessageJob>>,
    reminders: Arc<DelayedQueue<ReminderJob>>,
    offers: Arc<DelayedQueue<RejectedOfferJob>>,
    queue_backend: String,
    start_time: Instant,
}

impl MursalControlHandler {
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "One argument per wired subsystem")]
    pub fn new(
        engine: Arc<AutomationEngine>,
        resilience: Arc<ResilienceExecutor>,
        transport: Arc<dyn ChatTransport>,
        messages: Arc<DelayedQueue<MessageJob>>,
        reminders: Arc<DelayedQueue<ReminderJob>>,
        offers: Arc<DelayedQueue<RejectedOfferJob>>,
        queue_backend: String,
    ) -> Self {
        Self {
            engine,
            resilience,
            transport,
            messages,
            reminders,
            offers,
            queue_backend,
            start_time: Instant::now(),
        }
    }

    async fn handle_engine(&self, command: EngineCommand) -> mursal_control::Result<Response> {
        tracing::info!(command = ?command, "Control command: engine");

        let response = match command {
            EngineCommand::Start => {
                let status = self.engine.start().await.map_err(server_error)?;
                Response::data(ResponseData::EngineStatus(status))
            }
            EngineCommand::Stop => {
                let status = self.engine.stop().await.map_err(server_error)?;
                Response::data(ResponseData::EngineStatus(status))
            }
            EngineCommand::Status => Response::data(ResponseData::EngineStatus(self.engine.status())),
            EngineCommand::TriggerOnce => {
                let summary = self.engine.trigger_once().await.map_err(server_error)?;
                Response::data(ResponseData::CycleSummary(summary))
            }
            EngineCommand::ForceProcessNewOrders => {
                let summary = self
                    .engine
                    .force_process_new_orders()
                    .await
                    .map_err(server_error)?;
                Response::data(ResponseData::CycleSummary(summary))
            }
            EngineCommand::ResetTracking { purge_durable } => {
                self.engine
                    .reset_tracking(purge_durable)
                    .await
                    .map_err(server_error)?;
                Response::ok()
            }
        };

        Ok(response)
    }

    async fn handle_resilience(
        &self,
        command: ResilienceCommand,
    ) -> mursal_control::Result<Response> {
        tracing::info!(command = ?command, "Control command: resilience");

        let response = match command {
            ResilienceCommand::Stats => {
                Response::data(ResponseData::ResilienceStats(self.resilience.stats()))
            }
            ResilienceCommand::ResetStats => {
                self.resilience.reset_stats();
                Response::ok()
            }
            ResilienceCommand::Health => {
                let connected = self.transport.is_connected().await;
                Response::data(ResponseData::Health(
                    self.resilience.health_overview(connected),
                ))
            }
        };

        Ok(response)
    }

    async fn handle_queue(&self, command: QueueCommand) -> mursal_control::Result<Response> {
        match command {
            QueueCommand::Stats => {
                let stats = vec![
                    self.messages.stats().await,
                    self.reminders.stats().await,
                    self.offers.stats().await,
                ];
                Ok(Response::data(ResponseData::QueueStats(stats)))
            }
        }
    }

    async fn handle_system(&self, command: SystemCommand) -> mursal_control::Result<Response> {
        match command {
            SystemCommand::Ping => Ok(Response::data(ResponseData::Message("pong".to_string()))),
            SystemCommand::Status => Ok(Response::data(ResponseData::SystemStatus(SystemStatus {
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_secs: self.start_time.elapsed().as_secs(),
                queue_backend: self.queue_backend.clone(),
                engine_running: self.engine.status().is_running,
                transport_connected: self.transport.is_connected().await,
            }))),
        }
    }
}

#[async_trait]
impl CommandHandler for MursalControlHandler {
    async fn handle_request(&self, request: Request) -> mursal_control::Result<Response> {
        if !request.is_version_compatible() {
            return Err(ControlError::ServerError(format!(
                "Incompatible protocol version: client={}, server={}",
                request.version,
                mursal_control::PROTOCOL_VERSION
            )));
        }

        match request.command {
            RequestCommand::Engine(cmd) => self.handle_engine(cmd).await,
            RequestCommand::Resilience(cmd) => self.handle_resilience(cmd).await,
            RequestCommand::Queue(cmd) => self.handle_queue(cmd).await,
            RequestCommand::System(cmd) => self.handle_system(cmd).await,
        }
    }
}

fn server_error(error: mursal_engine::EngineError) -> ControlError {
    ControlError::ServerError(error.to_string())
}
