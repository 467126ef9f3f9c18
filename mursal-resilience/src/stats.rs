//! Resilience counters
//!
//! Counters are per operation family, cheap to update on the hot path,
//! and snapshotted consistently for the control surface.

use std::sync::Arc;

use ahash::AHashMap;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::{error::OutboundError, family::OperationFamily};

#[derive(Debug, Default)]
struct FamilyCounters {
    total_attempts: u64,
    successes: u64,
    failures: u64,
    successful_retries: u64,
    errors_by_code: AHashMap<String, u64>,
    last_error: Option<String>,
}

/// Snapshot of one family's counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyStats {
    /// Attempts made, first tries included.
    pub total_retries: u64,
    /// Operations that succeeded only after at least one retry.
    pub successful_retries: u64,
    /// Operations that ultimately succeeded.
    pub successes: u64,
    /// Operations that ultimately failed.
    pub failures: u64,
    /// Failure counts keyed by error code label.
    pub errors_by_code: AHashMap<String, u64>,
    /// Most recent error message, if any.
    pub last_error: Option<String>,
}

impl FamilyStats {
    /// Error rate over the observed attempts.
    ///
    /// A family with no attempts yet reads as zero, not as failing.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Counters fit f64 in practice")]
    pub fn error_rate(&self) -> f64 {
        if self.total_retries == 0 {
            return 0.0;
        }
        1.0 - self.successes as f64 / (self.total_retries as f64 + 1.0)
    }
}

/// Full stats snapshot, keyed by family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsOverview {
    pub families: AHashMap<OperationFamily, FamilyStats>,
}

impl StatsOverview {
    /// Stats for one family; zeroed counters when it has not run yet.
    #[must_use]
    pub fn family(&self, family: OperationFamily) -> FamilyStats {
        self.families.get(&family).cloned().unwrap_or(FamilyStats {
            total_retries: 0,
            successful_retries: 0,
            successes: 0,
            failures: 0,
            errors_by_code: AHashMap::new(),
            last_error: None,
        })
    }
}

/// Live resilience counters.
#[derive(Debug, Default)]
pub struct ResilienceStats {
    families: DashMap<OperationFamily, Arc<parking_lot::Mutex<FamilyCounters>>>,
}

impl ResilienceStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, family: OperationFamily) -> Arc<parking_lot::Mutex<FamilyCounters>> {
        self.families
            .entry(family)
            .or_insert_with(|| Arc::new(parking_lot::Mutex::new(FamilyCounters::default())))
            .clone()
    }

    /// Record one attempt being made.
    pub fn record_attempt(&self, family: OperationFamily) {
        self.counters(family).lock().total_attempts += 1;
    }

    /// Record an operation that completed successfully on `attempt`
    /// (1-indexed).
    pub fn record_success(&self, family: OperationFamily, attempt: u32) {
        let counters = self.counters(family);
        let mut counters = counters.lock();
        counters.successes += 1;
        if attempt > 1 {
            counters.successful_retries += 1;
        }
    }

    /// Record a failed attempt.
    pub fn record_error(&self, family: OperationFamily, error: &OutboundError) {
        let label = error
            .code()
            .map_or_else(|| "OTHER".to_string(), |code| code.label());

        let counters = self.counters(family);
        let mut counters = counters.lock();
        *counters.errors_by_code.entry(label).or_insert(0) += 1;
        counters.last_error = Some(error.to_string());
    }

    /// Record an operation that exhausted its attempts.
    pub fn record_exhausted(&self, family: OperationFamily) {
        self.counters(family).lock().failures += 1;
    }

    /// Consistent snapshot of every family's counters.
    pub fn snapshot(&self) -> StatsOverview {
        let mut families = AHashMap::new();
        for entry in &self.families {
            let counters = entry.value().lock();
            families.insert(
                *entry.key(),
                FamilyStats {
                    total_retries: counters.total_attempts,
                    successful_retries: counters.successful_retries,
                    successes: counters.successes,
                    failures: counters.failures,
                    errors_by_code: counters.errors_by_code.clone(),
                    last_error: counters.last_error.clone(),
                },
            );
        }
        StatsOverview { families }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.families.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorCode;

    use super::*;

    #[test]
    fn test_attempt_and_success_counters() {
        let stats = ResilienceStats::new();
        let family = OperationFamily::SheetRead;

        stats.record_attempt(family);
        stats.record_success(family, 1);

        let snap = stats.snapshot().family(family);
        assert_eq!(snap.total_retries, 1);
        assert_eq!(snap.successes, 1);
        assert_eq!(snap.successful_retries, 0);
    }

    #[test]
    fn test_success_after_retry_counts_as_successful_retry() {
        let stats = ResilienceStats::new();
        let family = OperationFamily::MessageSend;

        stats.record_attempt(family);
        stats.record_attempt(family);
        stats.record_success(family, 2);

        let snap = stats.snapshot().family(family);
        assert_eq!(snap.total_retries, 2);
        assert_eq!(snap.successful_retries, 1);
    }

    #[test]
    fn test_errors_counted_by_code() {
        let stats = ResilienceStats::new();
        let family = OperationFamily::MessageSend;

        let reset = OutboundError::transient(ErrorCode::ConnectionReset, "reset");
        let busy = OutboundError::from_http_status(503, "busy");
        stats.record_error(family, &reset);
        stats.record_error(family, &reset);
        stats.record_error(family, &busy);

        let snap = stats.snapshot().family(family);
        assert_eq!(snap.errors_by_code.get("ECONNRESET"), Some(&2));
        assert_eq!(snap.errors_by_code.get("HTTP_503"), Some(&1));
        assert!(snap.last_error.as_deref().is_some_and(|e| e.contains("busy")));
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let stats = ResilienceStats::new();
        let family = OperationFamily::SheetRead;

        stats.record_attempt(family);
        stats.record_exhausted(family);
        stats.reset();

        let snap = stats.snapshot().family(family);
        assert_eq!(snap.total_retries, 0);
        assert_eq!(snap.failures, 0);
        assert!(snap.errors_by_code.is_empty());
    }

    #[test]
    fn test_error_rate_formula() {
        let snap = FamilyStats {
            total_retries: 9,
            successful_retries: 0,
            successes: 5,
            failures: 4,
            errors_by_code: AHashMap::new(),
            last_error: None,
        };
        assert!((snap.error_rate() - 0.5).abs() < f64::EPSILON);
    }
}
