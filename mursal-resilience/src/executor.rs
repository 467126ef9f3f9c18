//! The resilience executor
//!
//! One entry point wraps every outbound call: breaker admission, per
//! attempt timeout, classification-aware retries with backoff, and
//! counter upkeep. Callers supply a factory so each retry gets a fresh
//! future.

use std::future::Future;

use crate::{
    breaker::{BreakerConfig, BreakerState, CircuitBreaker},
    error::{ErrorCode, OutboundError},
    family::OperationFamily,
    health::HealthOverview,
    retry::RetryPolicy,
    stats::{ResilienceStats, StatsOverview},
};

/// Executes outbound operations with retry, circuit breaking, and stats.
#[derive(Debug)]
pub struct ResilienceExecutor {
    breaker: CircuitBreaker,
    stats: ResilienceStats,
    sheet_policy: RetryPolicy,
    send_policy: RetryPolicy,
}

impl Default for ResilienceExecutor {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

impl ResilienceExecutor {
    /// Create an executor with per-family tuned retry policies.
    #[must_use]
    pub fn new(breaker_config: BreakerConfig) -> Self {
        Self {
            breaker: CircuitBreaker::new(breaker_config),
            stats: ResilienceStats::new(),
            sheet_policy: RetryPolicy::for_family(OperationFamily::SheetRead),
            send_policy: RetryPolicy::for_family(OperationFamily::MessageSend),
        }
    }

    /// Override a family's retry policy (used by tests and config).
    pub const fn set_policy(&mut self, family: OperationFamily, policy: RetryPolicy) {
        match family {
            OperationFamily::SheetRead => self.sheet_policy = policy,
            OperationFamily::MessageSend => self.send_policy = policy,
        }
    }

    const fn policy(&self, family: OperationFamily) -> &RetryPolicy {
        match family {
            OperationFamily::SheetRead => &self.sheet_policy,
            OperationFamily::MessageSend => &self.send_policy,
        }
    }

    /// Run an operation under the family's resilience envelope.
    ///
    /// `op` is called once per attempt. Transient retriable errors back
    /// off and retry up to the policy budget; anything else surfaces
    /// immediately. A breaker that is (or becomes) open fails fast with
    /// [`OutboundError::CircuitOpen`].
    ///
    /// # Errors
    ///
    /// Returns the final classified error once retries are exhausted, a
    /// non-retriable error as soon as it occurs, or `CircuitOpen` when the
    /// family's breaker rejects the call.
    pub async fn execute<T, F, Fut>(
        &self,
        family: OperationFamily,
        mut op: F,
    ) -> Result<T, OutboundError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OutboundError>>,
    {
        let policy = self.policy(family);
        let mut attempt = 0u32;

        loop {
            if !self.breaker.try_acquire(family) {
                tracing::debug!(family = %family, "Circuit open, rejecting call");
                return Err(OutboundError::CircuitOpen { family });
            }

            attempt += 1;
            self.stats.record_attempt(family);

            let result = match policy.attempt_timeout() {
                Some(timeout) => match tokio::time::timeout(timeout, op()).await {
                    Ok(result) => result,
                    Err(_) => Err(OutboundError::transient(
                        ErrorCode::TimedOut,
                        format!("attempt timed out after {}s", timeout.as_secs()),
                    )),
                },
                None => op().await,
            };

            match result {
                Ok(value) => {
                    self.breaker.record_success(family);
                    self.stats.record_success(family, attempt);
                    if attempt > 1 {
                        tracing::debug!(
                            family = %family,
                            attempt,
                            "Operation recovered after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    self.stats.record_error(family, &error);
                    self.breaker.record_failure(family);

                    if !error.is_retriable() {
                        self.stats.record_exhausted(family);
                        tracing::debug!(
                            family = %family,
                            error = %error,
                            "Non-retriable error, failing immediately"
                        );
                        return Err(error);
                    }

                    if !policy.should_retry(attempt) {
                        self.stats.record_exhausted(family);
                        tracing::warn!(
                            family = %family,
                            attempts = attempt,
                            error = %error,
                            "Retries exhausted"
                        );
                        return Err(error);
                    }

                    let delay = policy.backoff_delay(attempt);
                    tracing::debug!(
                        family = %family,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Transient failure, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Current breaker state for a family.
    pub fn breaker_state(&self, family: OperationFamily) -> BreakerState {
        self.breaker.state(family)
    }

    /// Stats snapshot across families.
    pub fn stats(&self) -> StatsOverview {
        self.stats.snapshot()
    }

    /// Zero the stats counters. Breaker state is deliberately untouched:
    /// an open circuit reflects upstream reality, not stale counters.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Assemble the operator-facing health overview.
    pub fn health_overview(&self, transport_connected: bool) -> HealthOverview {
        HealthOverview::assemble(
            &self.stats.snapshot(),
            self.breaker_state(OperationFamily::SheetRead),
            self.breaker_state(OperationFamily::MessageSend),
            transport_connected,
        )
    }
}
