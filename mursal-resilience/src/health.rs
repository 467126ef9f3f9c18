//! Operator-facing health overview
//!
//! Aggregates the resilience counters and breaker states into the shape
//! surfaced by the control socket and HTTP probes.

use serde::{Deserialize, Serialize};

use crate::{breaker::BreakerState, family::OperationFamily, stats::StatsOverview};

const DEGRADED_ERROR_RATE: f64 = 0.2;
const CRITICAL_ERROR_RATE: f64 = 0.5;

/// Coarse component condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Critical,
}

impl ComponentStatus {
    fn from_error_rate(rate: f64) -> Self {
        if rate >= CRITICAL_ERROR_RATE {
            Self::Critical
        } else if rate >= DEGRADED_ERROR_RATE {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }
}

/// Health of one upstream collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub error_rate: f64,
}

/// Network-level health: breaker states plus the blended error rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkHealth {
    pub status: ComponentStatus,
    pub sheet_breaker: BreakerState,
    pub send_breaker: BreakerState,
    pub error_rate: f64,
}

/// The full health overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthOverview {
    pub sheet_source: ComponentHealth,
    pub transport: ComponentHealth,
    pub network: NetworkHealth,
    pub overall: ComponentStatus,
}

impl HealthOverview {
    /// Build the overview from a stats snapshot and breaker states.
    ///
    /// A disconnected transport marks the transport component critical
    /// regardless of its error rate: nothing can be delivered. Overall
    /// reflects the network alone — critical while any breaker is open or
    /// the blended error rate is severe, degraded in the warning band,
    /// healthy otherwise.
    #[must_use]
    pub fn assemble(
        stats: &StatsOverview,
        sheet_breaker: BreakerState,
        send_breaker: BreakerState,
        transport_connected: bool,
    ) -> Self {
        let sheet_rate = stats.family(OperationFamily::SheetRead).error_rate();
        let send_rate = stats.family(OperationFamily::MessageSend).error_rate();

        let sheet_source = ComponentHealth {
            status: ComponentStatus::from_error_rate(sheet_rate),
            error_rate: sheet_rate,
        };

        let transport = ComponentHealth {
            status: if transport_connected {
                ComponentStatus::from_error_rate(send_rate)
            } else {
                ComponentStatus::Critical
            },
            error_rate: send_rate,
        };

        let blended_rate = sheet_rate.max(send_rate);
        let any_open =
            sheet_breaker == BreakerState::Open || send_breaker == BreakerState::Open;

        let network = NetworkHealth {
            status: if any_open {
                ComponentStatus::Critical
            } else {
                ComponentStatus::from_error_rate(blended_rate)
            },
            sheet_breaker,
            send_breaker,
            error_rate: blended_rate,
        };

        let overall = if any_open || blended_rate >= CRITICAL_ERROR_RATE {
            ComponentStatus::Critical
        } else if blended_rate >= DEGRADED_ERROR_RATE {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        };

        Self {
            sheet_source,
            transport,
            network,
            overall,
        }
    }
}

#[cfg(test)]
mod tests {
    use ahash::AHashMap;

    use crate::stats::FamilyStats;

    use super::*;

    fn stats_with(successes: u64, attempts: u64) -> StatsOverview {
        let mut families = AHashMap::new();
        for family in OperationFamily::ALL {
            families.insert(
                family,
                FamilyStats {
                    total_retries: attempts,
                    successful_retries: 0,
                    successes,
                    failures: attempts.saturating_sub(successes),
                    errors_by_code: AHashMap::new(),
                    last_error: None,
                },
            );
        }
        StatsOverview { families }
    }

    #[test]
    fn test_healthy_when_error_rate_low() {
        let overview = HealthOverview::assemble(
            &stats_with(99, 99),
            BreakerState::Closed,
            BreakerState::Closed,
            true,
        );
        assert_eq!(overview.overall, ComponentStatus::Healthy);
        assert_eq!(overview.sheet_source.status, ComponentStatus::Healthy);
    }

    #[test]
    fn test_open_breaker_is_critical() {
        let overview = HealthOverview::assemble(
            &stats_with(99, 99),
            BreakerState::Closed,
            BreakerState::Open,
            true,
        );
        assert_eq!(overview.overall, ComponentStatus::Critical);
        assert_eq!(overview.network.status, ComponentStatus::Critical);
        assert_eq!(overview.network.send_breaker, BreakerState::Open);
    }

    #[test]
    fn test_warning_band_is_degraded() {
        // 7 successes out of 9 attempts: rate = 1 - 7/10 = 0.3
        let overview = HealthOverview::assemble(
            &stats_with(7, 9),
            BreakerState::Closed,
            BreakerState::Closed,
            true,
        );
        assert_eq!(overview.overall, ComponentStatus::Degraded);
    }

    #[test]
    fn test_disconnected_transport_marks_component_only() {
        let overview = HealthOverview::assemble(
            &stats_with(99, 99),
            BreakerState::Closed,
            BreakerState::Closed,
            false,
        );
        // The transport component is critical, but overall tracks breaker
        // state and error rate alone.
        assert_eq!(overview.transport.status, ComponentStatus::Critical);
        assert_eq!(overview.overall, ComponentStatus::Healthy);
    }

    #[test]
    fn test_untouched_stats_read_as_idle_not_failing() {
        let overview = HealthOverview::assemble(
            &StatsOverview {
                families: AHashMap::new(),
            },
            BreakerState::Closed,
            BreakerState::Closed,
            true,
        );
        assert_eq!(overview.overall, ComponentStatus::Healthy);
        assert_eq!(overview.network.sheet_breaker, BreakerState::Closed);
    }
}
