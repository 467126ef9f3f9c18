//! The application container
//!
//! Owns every long-lived subsystem, wires them together, and runs them
//! under one `tokio::select!` until a shutdown signal lands on the
//! process-wide broadcast.

use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use mursal_common::{Signal, internal, logging};
use mursal_control::ControlServer;
use mursal_engine::{
    AutomationEngine, AutomationSettings, ChatTransport, EngineConfig, EngineDeps,
    MessageJobHandler, RejectedOfferJobHandler, ReminderJobHandler, SheetSource, settings,
};
use mursal_guard::{DuplicateGuard, GuardConfig};
use mursal_health::{HealthChecker, HealthConfig, HealthServer};
use mursal_queue::{DelayedQueue, QueueConfig, Worker, select_backend};
use mursal_resilience::{BreakerConfig, ResilienceExecutor};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::{
    adapters::{self, SheetAdapterConfig, TransportAdapterConfig},
    control_handler::MursalControlHandler,
};

/// Process-wide shutdown broadcast.
pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

/// Control surface configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// Unix socket the control server binds.
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
}

fn default_socket_path() -> String {
    mursal_control::DEFAULT_CONTROL_SOCKET.to_string()
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
        }
    }
}

/// The top-level service definition, deserialized from the config file.
#[derive(Default, Deserialize)]
pub struct Mursal {
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    settings: AutomationSettings,
    #[serde(default)]
    guard: GuardConfig,
    #[serde(default)]
    queue: QueueConfig,
    #[serde(default)]
    breaker: BreakerConfig,
    #[serde(default)]
    control: ControlConfig,
    #[serde(default)]
    health: HealthConfig,
    #[serde(default)]
    sheet: SheetAdapterConfig,
    #[serde(default)]
    transport: TransportAdapterConfig,
}

async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!("CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!("Terminate signal received, shutting down");
        }
    }

    let mut receiver = SHUTDOWN_BROADCAST.subscribe();

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    loop {
        tokio::select! {
            sig = receiver.recv() => {
                match sig {
                    Ok(s) => tracing::debug!("Received {s:?}"),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(e) => tracing::debug!("Received: {e:?}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    Ok(())
}

impl Mursal {
    /// Run the service with the adapters named in the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if any subsystem fails to initialize or serve.
    pub async fn run(self) -> anyhow::Result<()> {
        let sheet = adapters::build_sheet(&self.sheet);
        let transport = adapters::build_transport(&self.transport);
        self.run_with(sheet, transport).await
    }

    /// Run the service with injected collaborators.
    ///
    /// Production deployments call this with their real spreadsheet and
    /// chat-session implementations.
    ///
    /// # Errors
    ///
    /// Returns an error if any subsystem fails to initialize or serve.
    #[allow(clippy::too_many_lines, reason = "Linear wiring of every subsystem")]
    pub async fn run_with(
        self,
        sheet: Arc<dyn SheetSource>,
        transport: Arc<dyn ChatTransport>,
    ) -> anyhow::Result<()> {
        logging::init();
        internal!("Controller running");

        let guard = Arc::new(DuplicateGuard::open(&self.guard).await?);
        internal!(
            "Duplicate guard ready ({} durable keys, redis tier: {})",
            guard.durable_len().await,
            guard.has_redis_tier()
        );

        let selection = select_backend(&self.queue).await;
        let backend_name = selection.name().to_string();
        let messages = Arc::new(DelayedQueue::new("messages", &selection, &self.queue));
        let reminders = Arc::new(DelayedQueue::new("reminders", &selection, &self.queue));
        let offers = Arc::new(DelayedQueue::new("offers", &selection, &self.queue));

        let resilience = Arc::new(ResilienceExecutor::new(self.breaker));
        let shared_settings = settings::shared(self.settings);

        let engine = Arc::new(AutomationEngine::new(
            self.engine.clone(),
            EngineDeps {
                sheet: Arc::clone(&sheet),
                transport: Arc::clone(&transport),
                guard: Arc::clone(&guard),
                resilience: Arc::clone(&resilience),
                messages: Arc::clone(&messages),
                reminders: Arc::clone(&reminders),
                offers: Arc::clone(&offers),
                settings: Arc::clone(&shared_settings),
            },
        ));

        let poll = Duration::from_secs(self.queue.poll_interval_secs);
        let message_worker = Worker::new(
            Arc::clone(&messages),
            Arc::new(MessageJobHandler::new(
                Arc::clone(&transport),
                Arc::clone(&guard),
                Arc::clone(&resilience),
                &self.engine,
            )),
            poll,
        );
        let reminder_worker = Worker::new(
            Arc::clone(&reminders),
            Arc::new(ReminderJobHandler::new(
                Arc::clone(&sheet),
                Arc::clone(&guard),
                Arc::clone(&resilience),
                Arc::clone(&messages),
                Arc::clone(&shared_settings),
            )),
            poll,
        );
        let offer_worker = Worker::new(
            Arc::clone(&offers),
            Arc::new(RejectedOfferJobHandler::new(
                Arc::clone(&sheet),
                Arc::clone(&guard),
                Arc::clone(&resilience),
                Arc::clone(&messages),
                Arc::clone(&shared_settings),
            )),
            poll,
        );

        let control_handler = Arc::new(MursalControlHandler::new(
            Arc::clone(&engine),
            Arc::clone(&resilience),
            Arc::clone(&transport),
            Arc::clone(&messages),
            Arc::clone(&reminders),
            Arc::clone(&offers),
            backend_name,
        ));
        let control = ControlServer::new(self.control.socket_path.clone(), control_handler);

        let checker = Arc::new(HealthChecker::new(self.health.max_queue_depth));
        let health = HealthServer::new(self.health.clone(), Arc::clone(&checker)).await?;
        spawn_readiness_updates(
            Arc::clone(&checker),
            Arc::clone(&engine),
            Arc::clone(&transport),
            Arc::clone(&messages),
            SHUTDOWN_BROADCAST.subscribe(),
        );

        let ret = tokio::select! {
            r = engine.serve(SHUTDOWN_BROADCAST.subscribe()) => {
                r.map_err(Into::into)
            }
            () = message_worker.serve(SHUTDOWN_BROADCAST.subscribe()) => {
                Ok(())
            }
            () = reminder_worker.serve(SHUTDOWN_BROADCAST.subscribe()) => {
                Ok(())
            }
            () = offer_worker.serve(SHUTDOWN_BROADCAST.subscribe()) => {
                Ok(())
            }
            r = control.serve(SHUTDOWN_BROADCAST.subscribe()) => {
                r.map_err(Into::into)
            }
            r = health.serve(SHUTDOWN_BROADCAST.subscribe()) => {
                r.map_err(Into::into)
            }
            r = shutdown() => {
                r
            }
        };

        internal!("Shutting down...");

        ret
    }
}

/// Keep the health checker current without coupling probes to subsystems.
fn spawn_readiness_updates(
    checker: Arc<HealthChecker>,
    engine: Arc<AutomationEngine>,
    transport: Arc<dyn ChatTransport>,
    messages: Arc<DelayedQueue<mursal_engine::MessageJob>>,
    mut shutdown: broadcast::Receiver<Signal>,
) {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(Duration::from_secs(5));
        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let status = engine.status();
                    checker.set_engine_ready(status.is_running);
                    checker.set_sheet_ready(
                        status.performance.cycles > 0 && status.performance.last_error.is_none(),
                    );
                    checker.set_transport_ready(transport.is_connected().await);
                    checker.set_queue_depth(messages.stats().await.depth);
                }
                _ = shutdown.recv() => break,
            }
        }
    });
}
