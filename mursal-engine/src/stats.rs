//! Engine performance counters

use serde::{Deserialize, Serialize};

/// Why rows were skipped, cumulatively and per cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounters {
    /// No valid Egyptian number could be recovered.
    pub invalid_phone: u64,
    /// Status not in the mapping table.
    pub unmapped_status: u64,
    /// The kind's enable switch is off.
    pub disabled: u64,
    /// Seen before with the same status.
    pub unchanged: u64,
    /// Within the kind's resend cooldown.
    pub cooldown: u64,
    /// The duplicate guard blocked the send.
    pub guard_blocked: u64,
    /// Row processing threw; logged against the row.
    pub row_errors: u64,
}

impl SkipCounters {
    /// Fold another counter set into this one.
    pub fn absorb(&mut self, other: Self) {
        self.invalid_phone += other.invalid_phone;
        self.unmapped_status += other.unmapped_status;
        self.disabled += other.disabled;
        self.unchanged += other.unchanged;
        self.cooldown += other.cooldown;
        self.guard_blocked += other.guard_blocked;
        self.row_errors += other.row_errors;
    }
}

/// Outcome of one polling cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleSummary {
    /// Rows in the snapshot.
    pub rows: u64,
    /// Immediate messages enqueued.
    pub messages_enqueued: u64,
    /// Reminders scheduled.
    pub reminders_scheduled: u64,
    /// Rejected-offer follow-ups scheduled.
    pub offers_scheduled: u64,
    /// Rows skipped, by reason.
    pub skipped: SkipCounters,
    /// Wall time of the cycle.
    pub duration_ms: u64,
}

/// Cumulative engine statistics since start (or the last tracking reset).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStats {
    /// Cycles completed, failed fetches included.
    pub cycles: u64,
    /// Cycles whose snapshot fetch failed.
    pub failed_cycles: u64,
    /// Rows seen across all cycles.
    pub rows_seen: u64,
    /// Immediate messages enqueued.
    pub messages_enqueued: u64,
    /// Reminders scheduled.
    pub reminders_scheduled: u64,
    /// Rejected-offer follow-ups scheduled.
    pub offers_scheduled: u64,
    /// Skips, by reason.
    pub skipped: SkipCounters,
    /// Orders currently tracked in observation history.
    pub tracked_orders: u64,
    /// Duration of the most recent cycle.
    pub last_cycle_ms: u64,
    /// Most recent cycle-level error, if any.
    pub last_error: Option<String>,
}

impl EngineStats {
    /// Fold a completed cycle into the running totals.
    pub fn absorb_cycle(&mut self, summary: &CycleSummary) {
        self.cycles += 1;
        self.rows_seen += summary.rows;
        self.messages_enqueued += summary.messages_enqueued;
        self.reminders_scheduled += summary.reminders_scheduled;
        self.offers_scheduled += summary.offers_scheduled;
        self.skipped.absorb(summary.skipped);
        self.last_cycle_ms = summary.duration_ms;
        self.last_error = None;
    }

    /// Record a cycle that aborted before row processing.
    pub fn absorb_failure(&mut self, error: &str) {
        self.cycles += 1;
        self.failed_cycles += 1;
        self.last_error = Some(error.to_string());
    }
}
