//! Engine handle and serve loop
//!
//! A single cooperative loop owns all mutable tracking state. Admin
//! operations arrive as commands over a channel and are processed between
//! cycles, so a cycle and a tracking reset can never interleave.

pub mod cycle;

use std::{sync::Arc, time::Instant};

use mursal_common::{Signal, internal, unix_now};
use mursal_guard::DuplicateGuard;
use mursal_queue::DelayedQueue;
use mursal_resilience::ResilienceExecutor;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    EngineConfig, EngineError,
    jobs::{MessageJob, RejectedOfferJob, ReminderJob},
    settings::SharedSettings,
    sheet::SheetSource,
    stats::{CycleSummary, EngineStats},
    tracking::{CooldownTracker, ObservationHistory},
    transport::ChatTransport,
};

/// Everything the engine needs to do its work.
pub struct EngineDeps {
    pub sheet: Arc<dyn SheetSource>,
    pub transport: Arc<dyn ChatTransport>,
    pub guard: Arc<DuplicateGuard>,
    pub resilience: Arc<ResilienceExecutor>,
    pub messages: Arc<DelayedQueue<MessageJob>>,
    pub reminders: Arc<DelayedQueue<ReminderJob>>,
    pub offers: Arc<DelayedQueue<RejectedOfferJob>>,
    pub settings: SharedSettings,
}

/// Snapshot returned by `status()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStatus {
    pub is_running: bool,
    /// When the last cycle finished, seconds since the Unix epoch.
    pub last_check: Option<u64>,
    /// When the next cycle is due, seconds since the Unix epoch.
    pub next_check: Option<u64>,
    pub performance: EngineStats,
}

enum EngineCommand {
    Start {
        reply: oneshot::Sender<EngineStatus>,
    },
    Stop {
        reply: oneshot::Sender<EngineStatus>,
    },
    TriggerOnce {
        force: bool,
        reply: oneshot::Sender<Result<CycleSummary, String>>,
    },
    ResetTracking {
        purge_durable: bool,
        reply: oneshot::Sender<()>,
    },
}

/// The automation engine.
///
/// Cheap to share: admin surfaces hold the same instance behind an `Arc`
/// and talk to the loop through its command channel.
pub struct AutomationEngine {
    pub(crate) config: EngineConfig,
    pub(crate) deps: EngineDeps,
    cmd_tx: mpsc::Sender<EngineCommand>,
    cmd_rx: parking_lot::Mutex<Option<mpsc::Receiver<EngineCommand>>>,
    published: parking_lot::RwLock<EngineStatus>,
}

impl AutomationEngine {
    /// Create an engine. It does nothing until [`Self::serve`] runs.
    #[must_use]
    pub fn new(config: EngineConfig, deps: EngineDeps) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        Self {
            config,
            deps,
            cmd_tx,
            cmd_rx: parking_lot::Mutex::new(Some(cmd_rx)),
            published: parking_lot::RwLock::new(EngineStatus::default()),
        }
    }

    /// Current status snapshot.
    pub fn status(&self) -> EngineStatus {
        self.published.read().clone()
    }

    /// Current performance counters.
    pub fn stats(&self) -> EngineStats {
        self.published.read().performance.clone()
    }

    /// Begin polling. Idempotent: an already-running engine just returns
    /// its status.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ChannelClosed`] if the loop has exited.
    pub async fn start(&self) -> Result<EngineStatus, EngineError> {
        self.roundtrip(|reply| EngineCommand::Start { reply }).await
    }

    /// Halt polling at the next loop boundary. In-flight queue workers
    /// drain naturally.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ChannelClosed`] if the loop has exited.
    pub async fn stop(&self) -> Result<EngineStatus, EngineError> {
        self.roundtrip(|reply| EngineCommand::Stop { reply }).await
    }

    /// Run one cycle now, whether or not the engine is polling.
    ///
    /// # Errors
    ///
    /// Returns the cycle's failure, or `ChannelClosed` if the loop has
    /// exited.
    pub async fn trigger_once(&self) -> Result<CycleSummary, EngineError> {
        self.roundtrip(|reply| EngineCommand::TriggerOnce {
            force: false,
            reply,
        })
        .await?
        .map_err(EngineError::CycleFailed)
    }

    /// Run one cycle treating every new-order row as fireable, skipping
    /// classification but not the duplicate guard.
    ///
    /// # Errors
    ///
    /// Returns the cycle's failure, or `ChannelClosed` if the loop has
    /// exited.
    pub async fn force_process_new_orders(&self) -> Result<CycleSummary, EngineError> {
        self.roundtrip(|reply| EngineCommand::TriggerOnce { force: true, reply })
            .await?
            .map_err(EngineError::CycleFailed)
    }

    /// Purge observation history and in-process caches. The durable
    /// sent-key set is cleared only when `purge_durable` is set.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ChannelClosed`] if the loop has exited.
    pub async fn reset_tracking(&self, purge_durable: bool) -> Result<(), EngineError> {
        self.roundtrip(|reply| EngineCommand::ResetTracking {
            purge_durable,
            reply,
        })
        .await
    }

    async fn roundtrip<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> EngineCommand,
    ) -> Result<R, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(command(tx))
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Run the engine loop until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyServing`] when called twice.
    pub async fn serve(
        &self,
        mut shutdown: broadcast::Receiver<Signal>,
    ) -> Result<(), EngineError> {
        let Some(mut cmd_rx) = self.cmd_rx.lock().take() else {
            return Err(EngineError::AlreadyServing);
        };

        internal!("Automation engine starting");

        let mut history = ObservationHistory::new();
        let mut cooldowns = CooldownTracker::new();
        let mut stats = EngineStats::default();

        let mut running = self.config.auto_start;
        let mut last_check: Option<u64> = None;
        let mut next_due = Instant::now() + self.config.startup_delay();

        self.publish(running, last_check, running.then(|| due_unix(next_due)), &stats, &history);

        loop {
            let wait = next_due.saturating_duration_since(Instant::now());

            tokio::select! {
                () = tokio::time::sleep(wait), if running => {
                    match cycle::run_cycle_internal(self, &mut history, &mut cooldowns, false).await {
                        Ok(summary) => {
                            tracing::info!(
                                rows = summary.rows,
                                enqueued = summary.messages_enqueued,
                                duration_ms = summary.duration_ms,
                                "Cycle complete"
                            );
                            stats.absorb_cycle(&summary);
                            next_due = Instant::now() + self.config.check_interval();
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Cycle failed, rescheduling on failure interval");
                            stats.absorb_failure(&e.to_string());
                            next_due = Instant::now() + self.config.failure_retry();
                        }
                    }
                    last_check = Some(unix_now());
                    self.publish(running, last_check, Some(due_unix(next_due)), &stats, &history);
                }

                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    match cmd {
                        EngineCommand::Start { reply } => {
                            if running {
                                internal!("Engine already running, start is a no-op");
                            } else {
                                running = true;
                                next_due = Instant::now() + self.config.startup_delay();
                                internal!("Engine started");
                            }
                            self.publish(running, last_check, Some(due_unix(next_due)), &stats, &history);
                            let _ = reply.send(self.status());
                        }
                        EngineCommand::Stop { reply } => {
                            if running {
                                running = false;
                                internal!("Engine stopped");
                            }
                            self.publish(running, last_check, None, &stats, &history);
                            let _ = reply.send(self.status());
                        }
                        EngineCommand::TriggerOnce { force, reply } => {
                            let result =
                                cycle::run_cycle_internal(self, &mut history, &mut cooldowns, force)
                                    .await;
                            match &result {
                                Ok(summary) => stats.absorb_cycle(summary),
                                Err(e) => stats.absorb_failure(&e.to_string()),
                            }
                            last_check = Some(unix_now());
                            self.publish(
                                running,
                                last_check,
                                running.then(|| due_unix(next_due)),
                                &stats,
                                &history,
                            );
                            let _ = reply.send(result.map_err(|e| e.to_string()));
                        }
                        EngineCommand::ResetTracking { purge_durable, reply } => {
                            history.clear();
                            cooldowns.clear();
                            self.deps.guard.reset_cache();
                            if purge_durable
                                && let Err(e) = self.deps.guard.clear_durable().await
                            {
                                tracing::error!(error = %e, "Failed to purge durable sent keys");
                            }
                            internal!("Tracking reset (purge_durable: {purge_durable})");
                            self.publish(
                                running,
                                last_check,
                                running.then(|| due_unix(next_due)),
                                &stats,
                                &history,
                            );
                            let _ = reply.send(());
                        }
                    }
                }

                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown | Signal::Finalised) => {
                            internal!("Automation engine received shutdown signal");
                            break;
                        }
                        Err(e) => {
                            tracing::error!("Engine shutdown channel error: {e}");
                            break;
                        }
                    }
                }
            }
        }

        internal!("Automation engine stopped");
        Ok(())
    }

    fn publish(
        &self,
        is_running: bool,
        last_check: Option<u64>,
        next_check: Option<u64>,
        stats: &EngineStats,
        history: &ObservationHistory,
    ) {
        let mut performance = stats.clone();
        performance.tracked_orders = history.len() as u64;
        *self.published.write() = EngineStatus {
            is_running,
            last_check,
            next_check,
            performance,
        };
    }
}

/// Project a loop instant onto the Unix clock for status reporting.
fn due_unix(due: Instant) -> u64 {
    let remaining = due.saturating_duration_since(Instant::now());
    unix_now().saturating_add(remaining.as_secs())
}
