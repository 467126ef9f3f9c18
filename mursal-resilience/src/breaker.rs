//! Per-family circuit breaker
//!
//! Protects the upstream collaborators from retry storms during prolonged
//! outages. States:
//! - **Closed**: normal operation, all calls admitted
//! - **Open**: tripped by consecutive failures, calls rejected immediately
//! - **Half-Open**: cooling-off elapsed, a bounded number of probe calls
//!   admitted to test recovery
//!
//! ```text
//! ┌─────────┐  threshold consecutive failures  ┌──────┐
//! │ Closed  │ ───────────────────────────────▶ │ Open │
//! └─────────┘                                  └──────┘
//!     ▲                                           │ cooling-off elapsed
//!     │ probe success            ┌───────────┐    ▼
//!     └──────────────────────────│ Half-Open │◀───┘
//!                                └───────────┘
//!                                      │ probe failure
//!                                      ▼
//!                                  ┌──────┐
//!                                  │ Open │ (fresh cooling-off)
//!                                  └──────┘
//! ```

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::family::OperationFamily;

/// Circuit breaker tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures required to open the circuit.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// How long the circuit stays open before probing recovery (seconds).
    #[serde(default = "default_open_secs")]
    pub open_secs: u64,

    /// Probe calls admitted while half-open before rejecting again.
    #[serde(default = "default_half_open_probes")]
    pub half_open_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            open_secs: default_open_secs(),
            half_open_probes: default_half_open_probes(),
        }
    }
}

const fn default_failure_threshold() -> u32 {
    10
}

const fn default_open_secs() -> u64 {
    60
}

const fn default_half_open_probes() -> u32 {
    3
}

/// Circuit state, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerData {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_probes: u32,
    config: BreakerConfig,
}

impl BreakerData {
    const fn new(config: BreakerConfig) -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            half_open_probes: 0,
            config,
        }
    }

    fn is_cooling_off_expired(&self) -> bool {
        self.opened_at.is_some_and(|opened_at| {
            Instant::now().duration_since(opened_at) >= Duration::from_secs(self.config.open_secs)
        })
    }

    /// Whether a call may proceed, transitioning Open → Half-Open when the
    /// cooling-off period has elapsed.
    fn try_acquire(&mut self, family: OperationFamily) -> bool {
        match self.state {
            BreakerState::Closed => true,
            BreakerState::Open => {
                if self.is_cooling_off_expired() {
                    self.state = BreakerState::HalfOpen;
                    self.half_open_probes = 1;
                    tracing::info!(
                        family = %family,
                        "Circuit breaker entering HALF-OPEN state - probing recovery"
                    );
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen => {
                if self.half_open_probes < self.config.half_open_probes {
                    self.half_open_probes += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Returns `true` if the circuit transitioned to Open.
    fn record_failure(&mut self, family: OperationFamily) -> bool {
        match self.state {
            BreakerState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.config.failure_threshold {
                    self.state = BreakerState::Open;
                    self.opened_at = Some(Instant::now());
                    tracing::warn!(
                        family = %family,
                        consecutive_failures = self.consecutive_failures,
                        open_secs = self.config.open_secs,
                        "Circuit breaker OPENED - rejecting calls to protect upstream"
                    );
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen => {
                self.state = BreakerState::Open;
                self.opened_at = Some(Instant::now());
                self.half_open_probes = 0;
                tracing::warn!(
                    family = %family,
                    "Circuit breaker probe failed - reopening circuit"
                );
                true
            }
            BreakerState::Open => false,
        }
    }

    /// Returns `true` if the circuit transitioned to Closed.
    fn record_success(&mut self, family: OperationFamily) -> bool {
        match self.state {
            BreakerState::Closed => {
                self.consecutive_failures = 0;
                false
            }
            BreakerState::HalfOpen => {
                self.state = BreakerState::Closed;
                self.consecutive_failures = 0;
                self.opened_at = None;
                self.half_open_probes = 0;
                tracing::info!(
                    family = %family,
                    "Circuit breaker CLOSED - normal operation resumed"
                );
                true
            }
            BreakerState::Open => {
                tracing::warn!(
                    family = %family,
                    "Unexpected success while circuit is open"
                );
                false
            }
        }
    }
}

/// Per-family circuit breaker manager.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    breakers: DashMap<OperationFamily, Arc<parking_lot::Mutex<BreakerData>>>,
}

impl CircuitBreaker {
    /// Create a breaker manager; families materialize on first use.
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    fn get_breaker(&self, family: OperationFamily) -> Arc<parking_lot::Mutex<BreakerData>> {
        self.breakers
            .entry(family)
            .or_insert_with(|| Arc::new(parking_lot::Mutex::new(BreakerData::new(self.config))))
            .clone()
    }

    /// Whether a call for this family may proceed right now.
    pub fn try_acquire(&self, family: OperationFamily) -> bool {
        self.get_breaker(family).lock().try_acquire(family)
    }

    /// Record a successful call. Returns `true` on an Open/Half-Open →
    /// Closed recovery.
    pub fn record_success(&self, family: OperationFamily) -> bool {
        self.get_breaker(family).lock().record_success(family)
    }

    /// Record a failed call. Returns `true` if the circuit tripped.
    pub fn record_failure(&self, family: OperationFamily) -> bool {
        self.get_breaker(family).lock().record_failure(family)
    }

    /// Current state for a family.
    pub fn state(&self, family: OperationFamily) -> BreakerState {
        self.get_breaker(family).lock().state
    }

    /// Whether any family's circuit is currently open.
    pub fn any_open(&self) -> bool {
        OperationFamily::ALL
            .iter()
            .any(|family| self.state(*family) == BreakerState::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, open_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            failure_threshold: threshold,
            open_secs,
            half_open_probes: 3,
        })
    }

    #[test]
    fn test_trips_after_consecutive_failures() {
        let cb = breaker(3, 60);
        let family = OperationFamily::MessageSend;

        cb.record_failure(family);
        cb.record_failure(family);
        assert_eq!(cb.state(family), BreakerState::Closed);
        assert!(cb.try_acquire(family));

        cb.record_failure(family);
        assert_eq!(cb.state(family), BreakerState::Open);
        assert!(!cb.try_acquire(family));
    }

    #[test]
    fn test_success_resets_consecutive_count() {
        let cb = breaker(3, 60);
        let family = OperationFamily::MessageSend;

        cb.record_failure(family);
        cb.record_failure(family);
        cb.record_success(family);
        cb.record_failure(family);
        cb.record_failure(family);
        assert_eq!(cb.state(family), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_after_cooling_off() {
        let cb = breaker(2, 0);
        let family = OperationFamily::SheetRead;

        cb.record_failure(family);
        cb.record_failure(family);
        assert_eq!(cb.state(family), BreakerState::Open);

        // Zero cooling-off: the next acquire becomes the first probe.
        assert!(cb.try_acquire(family));
        assert_eq!(cb.state(family), BreakerState::HalfOpen);
    }

    #[test]
    fn test_half_open_admits_bounded_probes() {
        let cb = breaker(2, 0);
        let family = OperationFamily::SheetRead;

        cb.record_failure(family);
        cb.record_failure(family);

        // Transition probe plus two more fill the budget of three.
        assert!(cb.try_acquire(family));
        assert!(cb.try_acquire(family));
        assert!(cb.try_acquire(family));
        assert!(!cb.try_acquire(family));
    }

    #[test]
    fn test_probe_success_closes_circuit() {
        let cb = breaker(2, 0);
        let family = OperationFamily::SheetRead;

        cb.record_failure(family);
        cb.record_failure(family);
        assert!(cb.try_acquire(family));

        assert!(cb.record_success(family));
        assert_eq!(cb.state(family), BreakerState::Closed);
        assert!(cb.try_acquire(family));
    }

    #[test]
    fn test_probe_failure_reopens_circuit() {
        let cb = breaker(2, 0);
        let family = OperationFamily::SheetRead;

        cb.record_failure(family);
        cb.record_failure(family);
        assert!(cb.try_acquire(family));
        assert_eq!(cb.state(family), BreakerState::HalfOpen);

        cb.record_failure(family);
        assert_eq!(cb.state(family), BreakerState::Open);
    }

    #[test]
    fn test_open_circuit_rejects_until_cooling_off() {
        let cb = breaker(2, 60);
        let family = OperationFamily::SheetRead;

        cb.record_failure(family);
        cb.record_failure(family);
        assert!(!cb.try_acquire(family));
        assert_eq!(cb.state(family), BreakerState::Open);
    }

    #[test]
    fn test_families_are_independent() {
        let cb = breaker(2, 60);

        cb.record_failure(OperationFamily::SheetRead);
        cb.record_failure(OperationFamily::SheetRead);

        assert_eq!(cb.state(OperationFamily::SheetRead), BreakerState::Open);
        assert_eq!(cb.state(OperationFamily::MessageSend), BreakerState::Closed);
        assert!(cb.any_open());
        assert!(cb.try_acquire(OperationFamily::MessageSend));
    }
}
