//! Queue job handlers
//!
//! The message handler is the only code path that touches the transport.
//! The reminder and offer handlers never send directly: they re-validate
//! their precondition against a fresh sheet snapshot and, when it holds,
//! feed an immediate message job back into the message queue.

use std::{sync::Arc, time::Duration};

use mursal_common::{MessageKind, TemplateContext, template};
use mursal_guard::DuplicateGuard;
use mursal_queue::{DelayedQueue, JobError, JobHandler};
use mursal_resilience::{OperationFamily, OutboundError, ResilienceExecutor};
use rand::Rng;

use crate::{
    EngineConfig,
    jobs::{MessageJob, RejectedOfferJob, ReminderJob},
    settings::SharedSettings,
    sheet::SheetSource,
    transport::{ChatTransport, SendOutcome},
};

/// Delivers immediate message jobs through the transport.
pub struct MessageJobHandler {
    transport: Arc<dyn ChatTransport>,
    guard: Arc<DuplicateGuard>,
    resilience: Arc<ResilienceExecutor>,
    jitter_ms: (u64, u64),
    transport_down_defer: Duration,
}

impl MessageJobHandler {
    #[must_use]
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        guard: Arc<DuplicateGuard>,
        resilience: Arc<ResilienceExecutor>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            transport,
            guard,
            resilience,
            jitter_ms: (config.send_jitter_min_ms, config.send_jitter_max_ms),
            transport_down_defer: config.transport_down_defer(),
        }
    }

    fn send_jitter(&self) -> Duration {
        let (min, max) = self.jitter_ms;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

#[async_trait::async_trait]
impl JobHandler<MessageJob> for MessageJobHandler {
    async fn handle(&self, job: &MessageJob) -> Result<(), JobError> {
        if !self.transport.is_connected().await {
            return Err(JobError::Defer {
                reason: "transport not connected".to_string(),
                delay: self.transport_down_defer,
            });
        }

        // Small random pause dampens upstream rate limiting.
        tokio::time::sleep(self.send_jitter()).await;

        // Race-safe double check: the engine verified at enqueue time, but
        // a job may have waited in the queue across cycles.
        if !self
            .guard
            .should_send(
                &job.order_id,
                job.kind,
                Some(job.phone.as_str()),
                Some(&job.customer_name),
            )
            .await
        {
            return Err(JobError::Discard("already sent".to_string()));
        }

        let transport = Arc::clone(&self.transport);
        let outcome = self
            .resilience
            .execute(OperationFamily::MessageSend, || {
                transport.send(&job.phone, &job.body)
            })
            .await;

        match outcome {
            Ok(SendOutcome::Delivered) => {
                self.guard
                    .mark_sent(
                        &job.order_id,
                        job.kind,
                        Some(job.phone.as_str()),
                        Some(&job.customer_name),
                    )
                    .await;
                tracing::info!(
                    order = %job.order_id,
                    kind = %job.kind,
                    "Message delivered"
                );
                Ok(())
            }
            Ok(SendOutcome::Ambiguous) => {
                // No clear ack: do not mark the guard, do not retry. A
                // retry could double-deliver; the order stays eligible
                // only through a future status change.
                tracing::warn!(
                    order = %job.order_id,
                    kind = %job.kind,
                    "Ambiguous transport ack, dropping job unmarked"
                );
                Err(JobError::Discard("ambiguous ack".to_string()))
            }
            Err(OutboundError::CircuitOpen { family }) => Err(JobError::Defer {
                reason: format!("circuit open for {family}"),
                delay: self.transport_down_defer,
            }),
            Err(OutboundError::TransportDown) => Err(JobError::Defer {
                reason: "transport dropped mid-send".to_string(),
                delay: self.transport_down_defer,
            }),
            Err(e) => Err(JobError::Failed(e.to_string())),
        }
    }
}

/// Fires reminders whose precondition still holds.
pub struct ReminderJobHandler {
    sheet: Arc<dyn SheetSource>,
    guard: Arc<DuplicateGuard>,
    resilience: Arc<ResilienceExecutor>,
    messages: Arc<DelayedQueue<MessageJob>>,
    settings: SharedSettings,
}

impl ReminderJobHandler {
    #[must_use]
    pub const fn new(
        sheet: Arc<dyn SheetSource>,
        guard: Arc<DuplicateGuard>,
        resilience: Arc<ResilienceExecutor>,
        messages: Arc<DelayedQueue<MessageJob>>,
        settings: SharedSettings,
    ) -> Self {
        Self {
            sheet,
            guard,
            resilience,
            messages,
            settings,
        }
    }
}

#[async_trait::async_trait]
impl JobHandler<ReminderJob> for ReminderJobHandler {
    async fn handle(&self, job: &ReminderJob) -> Result<(), JobError> {
        let settings = self.settings.read().clone();
        if !settings.enabled.reminder {
            return Err(JobError::Discard("reminders disabled".to_string()));
        }

        let sheet = Arc::clone(&self.sheet);
        let rows = self
            .resilience
            .execute(OperationFamily::SheetRead, || sheet.fetch_rows())
            .await
            .map_err(|e| JobError::Failed(format!("snapshot fetch failed: {e}")))?;

        let Some(row) = rows.iter().find(|row| row.stable_key() == job.order_id) else {
            return Err(JobError::Discard("order no longer in sheet".to_string()));
        };

        if row.status.trim() != job.status {
            return Err(JobError::Discard(format!(
                "status moved from '{}' to '{}'",
                job.status,
                row.status.trim()
            )));
        }

        if !self
            .guard
            .should_send(
                &job.order_id,
                MessageKind::Reminder,
                Some(job.phone.as_str()),
                Some(&job.customer_name),
            )
            .await
        {
            return Err(JobError::Discard("already reminded".to_string()));
        }

        let body = template::render(
            settings.templates.for_kind(MessageKind::Reminder),
            &TemplateContext {
                name: non_empty(&job.customer_name),
                order_id: Some(job.order_id.clone()),
                amount: Some(row.amount()),
                product_name: non_empty(row.product_name.trim()),
                company_name: non_empty(&settings.company_name),
                ..Default::default()
            },
        );

        self.messages
            .enqueue(
                MessageJob {
                    phone: job.phone.clone(),
                    body,
                    order_id: job.order_id.clone(),
                    row_index: job.row_index,
                    customer_name: job.customer_name.clone(),
                    kind: MessageKind::Reminder,
                },
                Duration::ZERO,
            )
            .await
            .map_err(|e| JobError::Failed(format!("failed to enqueue reminder message: {e}")))?;

        tracing::info!(order = %job.order_id, "Reminder released to message queue");
        Ok(())
    }
}

/// Fires discounted follow-up offers for orders still rejected.
pub struct RejectedOfferJobHandler {
    sheet: Arc<dyn SheetSource>,
    guard: Arc<DuplicateGuard>,
    resilience: Arc<ResilienceExecutor>,
    messages: Arc<DelayedQueue<MessageJob>>,
    settings: SharedSettings,
}

impl RejectedOfferJobHandler {
    #[must_use]
    pub const fn new(
        sheet: Arc<dyn SheetSource>,
        guard: Arc<DuplicateGuard>,
        resilience: Arc<ResilienceExecutor>,
        messages: Arc<DelayedQueue<MessageJob>>,
        settings: SharedSettings,
    ) -> Self {
        Self {
            sheet,
            guard,
            resilience,
            messages,
            settings,
        }
    }
}

#[async_trait::async_trait]
impl JobHandler<RejectedOfferJob> for RejectedOfferJobHandler {
    async fn handle(&self, job: &RejectedOfferJob) -> Result<(), JobError> {
        let settings = self.settings.read().clone();
        if !settings.enabled.rejected_offer {
            return Err(JobError::Discard("rejected offers disabled".to_string()));
        }

        let sheet = Arc::clone(&self.sheet);
        let rows = self
            .resilience
            .execute(OperationFamily::SheetRead, || sheet.fetch_rows())
            .await
            .map_err(|e| JobError::Failed(format!("snapshot fetch failed: {e}")))?;

        let Some(row) = rows.iter().find(|row| row.stable_key() == job.order_id) else {
            return Err(JobError::Discard("order no longer in sheet".to_string()));
        };

        if row.status.trim() != job.status {
            return Err(JobError::Discard(format!(
                "status moved from '{}' to '{}'",
                job.status,
                row.status.trim()
            )));
        }

        if !self
            .guard
            .should_send(
                &job.order_id,
                MessageKind::RejectedOffer,
                Some(job.phone.as_str()),
                Some(&job.customer_name),
            )
            .await
        {
            return Err(JobError::Discard("offer already sent".to_string()));
        }

        let (discounted, saved) = settings.discount(job.amount);
        let body = template::render(
            settings.templates.for_kind(MessageKind::RejectedOffer),
            &TemplateContext {
                name: non_empty(&job.customer_name),
                order_id: Some(job.order_id.clone()),
                amount: Some(job.amount),
                product_name: non_empty(row.product_name.trim()),
                discounted_amount: Some(discounted),
                saved_amount: Some(saved),
                company_name: non_empty(&settings.company_name),
                ..Default::default()
            },
        );

        self.messages
            .enqueue(
                MessageJob {
                    phone: job.phone.clone(),
                    body,
                    order_id: job.order_id.clone(),
                    row_index: job.row_index,
                    customer_name: job.customer_name.clone(),
                    kind: MessageKind::RejectedOffer,
                },
                Duration::ZERO,
            )
            .await
            .map_err(|e| JobError::Failed(format!("failed to enqueue offer message: {e}")))?;

        tracing::info!(order = %job.order_id, "Rejected offer released to message queue");
        Ok(())
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
