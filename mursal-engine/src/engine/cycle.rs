//! One polling cycle: fetch, classify, emit

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use mursal_common::{
    MessageKind, OrderRow, TemplateContext, message::kind_for_status, phone, template, unix_now,
};
use mursal_resilience::OperationFamily;

use crate::{
    AutomationEngine, EngineError,
    jobs::{MessageJob, RejectedOfferJob, ReminderJob},
    settings::AutomationSettings,
    stats::{CycleSummary, SkipCounters},
    tracking::{CooldownTracker, ObservationHistory},
};

/// Why one row fired nothing this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipReason {
    InvalidPhone,
    UnmappedStatus,
    Disabled,
    Unchanged,
    Cooldown,
    GuardBlocked,
}

/// What one row produced.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RowOutcome {
    Fired {
        reminder_scheduled: bool,
        offer_scheduled: bool,
    },
    Skipped(SkipReason),
}

fn tally(counters: &mut SkipCounters, reason: SkipReason) {
    match reason {
        SkipReason::InvalidPhone => counters.invalid_phone += 1,
        SkipReason::UnmappedStatus => counters.unmapped_status += 1,
        SkipReason::Disabled => counters.disabled += 1,
        SkipReason::Unchanged => counters.unchanged += 1,
        SkipReason::Cooldown => counters.cooldown += 1,
        SkipReason::GuardBlocked => counters.guard_blocked += 1,
    }
}

/// Run one full cycle.
///
/// A snapshot-fetch failure aborts the cycle; a failure inside any single
/// row is logged against that row and the cycle continues. Observation
/// history is updated for every row, fired or not, errored or not.
pub(crate) async fn run_cycle_internal(
    engine: &AutomationEngine,
    history: &mut ObservationHistory,
    cooldowns: &mut CooldownTracker,
    force: bool,
) -> Result<CycleSummary, EngineError> {
    let started = Instant::now();
    let settings = engine.deps.settings.read().clone();

    let transport_connected = engine.deps.transport.is_connected().await;
    if !transport_connected {
        tracing::info!(
            "Transport disconnected; classifying and queueing, delivery resumes on reconnect"
        );
    }

    let sheet = Arc::clone(&engine.deps.sheet);
    let rows = engine
        .deps
        .resilience
        .execute(OperationFamily::SheetRead, || sheet.fetch_rows())
        .await?;

    let mut summary = CycleSummary {
        rows: rows.len() as u64,
        ..Default::default()
    };

    for row in &rows {
        match process_row(engine, history, cooldowns, &settings, row, force).await {
            Ok(RowOutcome::Fired {
                reminder_scheduled,
                offer_scheduled,
            }) => {
                summary.messages_enqueued += 1;
                summary.reminders_scheduled += u64::from(reminder_scheduled);
                summary.offers_scheduled += u64::from(offer_scheduled);
            }
            Ok(RowOutcome::Skipped(reason)) => tally(&mut summary.skipped, reason),
            Err(e) => {
                tracing::warn!(
                    row_index = row.row_index,
                    error = %e,
                    "Row processing failed, continuing cycle"
                );
                summary.skipped.row_errors += 1;
            }
        }

        history.observe(row.stable_key(), &row.status, unix_now());
    }

    summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok(summary)
}

/// Decide and emit for a single row.
///
/// Firing order matters: phone validity first (nothing can be delivered
/// without a destination), then classification against history, the
/// status mapping, the enable switch, the resend cooldown, and finally
/// the duplicate guard, which dominates everything.
async fn process_row(
    engine: &AutomationEngine,
    history: &ObservationHistory,
    cooldowns: &mut CooldownTracker,
    settings: &AutomationSettings,
    row: &OrderRow,
    force: bool,
) -> Result<RowOutcome, EngineError> {
    let now = unix_now();
    let key = row.stable_key();
    let status = row.status.trim();

    let Some(canonical) = phone::canonicalize(&row.primary_phone, &row.alternate_phone) else {
        tracing::debug!(row_index = row.row_index, "No valid Egyptian number, row skipped");
        return Ok(RowOutcome::Skipped(SkipReason::InvalidPhone));
    };

    let Some(kind) = kind_for_status(status) else {
        tracing::debug!(
            row_index = row.row_index,
            status,
            "Unmapped status, row skipped"
        );
        return Ok(RowOutcome::Skipped(SkipReason::UnmappedStatus));
    };

    let prev = history.get(&key);
    let is_new = prev.is_none();
    let status_changed = prev.is_some_and(|obs| obs.status != status);
    let forced = force && kind == MessageKind::NewOrder;

    if !(forced || is_new || status_changed) {
        return Ok(RowOutcome::Skipped(SkipReason::Unchanged));
    }

    if !settings.enabled.allows(kind) {
        return Ok(RowOutcome::Skipped(SkipReason::Disabled));
    }

    if !forced && !cooldowns.allows(&key, kind, now) {
        return Ok(RowOutcome::Skipped(SkipReason::Cooldown));
    }

    let name = row.customer_name.trim();
    if !engine
        .deps
        .guard
        .should_send(&key, kind, Some(canonical.as_str()), Some(name))
        .await
    {
        tracing::debug!(order = %key, kind = %kind, "Duplicate guard blocked send");
        return Ok(RowOutcome::Skipped(SkipReason::GuardBlocked));
    }

    let body = template::render(
        settings.templates.for_kind(kind),
        &row_context(settings, row, &key, kind),
    );

    engine
        .deps
        .messages
        .enqueue(
            MessageJob {
                phone: canonical.clone(),
                body,
                order_id: key.clone(),
                row_index: row.row_index,
                customer_name: name.to_string(),
                kind,
            },
            Duration::ZERO,
        )
        .await?;
    cooldowns.record(key.clone(), kind, now);

    let mut reminder_scheduled = false;
    if kind == MessageKind::NewOrder && settings.enabled.reminder {
        engine
            .deps
            .reminders
            .enqueue(
                ReminderJob {
                    order_id: key.clone(),
                    row_index: row.row_index,
                    phone: canonical.clone(),
                    customer_name: name.to_string(),
                    status: status.to_string(),
                },
                settings.reminder_delay(),
            )
            .await?;
        reminder_scheduled = true;
    }

    let mut offer_scheduled = false;
    if kind == MessageKind::RejectedOffer {
        engine
            .deps
            .offers
            .enqueue(
                RejectedOfferJob {
                    order_id: key,
                    row_index: row.row_index,
                    phone: canonical,
                    customer_name: name.to_string(),
                    status: status.to_string(),
                    amount: row.amount(),
                },
                settings.rejected_offer_delay(),
            )
            .await?;
        offer_scheduled = true;
    }

    Ok(RowOutcome::Fired {
        reminder_scheduled,
        offer_scheduled,
    })
}

/// Build the template context for an immediate row-driven message.
pub(crate) fn row_context(
    settings: &AutomationSettings,
    row: &OrderRow,
    key: &str,
    kind: MessageKind,
) -> TemplateContext {
    let amount = row.amount();
    let (discounted, saved) = if kind == MessageKind::RejectedOffer {
        let (d, s) = settings.discount(amount);
        (Some(d), Some(s))
    } else {
        (None, None)
    };

    TemplateContext {
        name: non_empty(row.customer_name.trim()),
        order_id: Some(key.to_string()),
        amount: Some(amount),
        product_name: non_empty(row.product_name.trim()),
        tracking_number: None,
        discounted_amount: discounted,
        saved_amount: saved,
        company_name: non_empty(&settings.company_name),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
