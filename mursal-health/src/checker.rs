//! Health check logic

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Thread-safe readiness tracking for the service's components.
#[derive(Debug)]
pub struct HealthChecker {
    /// Whether the engine loop is serving
    engine_ready: AtomicBool,

    /// Whether the chat transport reports connected
    transport_ready: AtomicBool,

    /// Whether the last order-book fetch succeeded
    sheet_ready: AtomicBool,

    /// Combined depth of the message queues
    queue_depth: AtomicU64,

    /// Queue depth threshold for readiness
    max_queue_depth: u64,
}

impl HealthChecker {
    /// Create a checker; everything starts not-ready.
    #[must_use]
    pub const fn new(max_queue_depth: u64) -> Self {
        Self {
            engine_ready: AtomicBool::new(false),
            transport_ready: AtomicBool::new(false),
            sheet_ready: AtomicBool::new(false),
            queue_depth: AtomicU64::new(0),
            max_queue_depth,
        }
    }

    pub fn set_engine_ready(&self, ready: bool) {
        self.engine_ready.store(ready, Ordering::Relaxed);
        tracing::debug!(ready, "Engine readiness updated");
    }

    pub fn set_transport_ready(&self, ready: bool) {
        self.transport_ready.store(ready, Ordering::Relaxed);
        tracing::debug!(ready, "Transport readiness updated");
    }

    pub fn set_sheet_ready(&self, ready: bool) {
        self.sheet_ready.store(ready, Ordering::Relaxed);
        tracing::debug!(ready, "Sheet readiness updated");
    }

    pub fn set_queue_depth(&self, depth: u64) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    /// Liveness: if we can answer at all, we are alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        true
    }

    /// Readiness: every component up and the queues below threshold.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        let engine_ok = self.engine_ready.load(Ordering::Relaxed);
        let transport_ok = self.transport_ready.load(Ordering::Relaxed);
        let sheet_ok = self.sheet_ready.load(Ordering::Relaxed);
        let depth = self.queue_depth.load(Ordering::Relaxed);

        engine_ok && transport_ok && sheet_ok && depth < self.max_queue_depth
    }

    /// Detailed status for debugging failed probes.
    #[must_use]
    pub fn get_status(&self) -> HealthStatus {
        HealthStatus {
            alive: self.is_alive(),
            ready: self.is_ready(),
            engine_ready: self.engine_ready.load(Ordering::Relaxed),
            transport_ready: self.transport_ready.load(Ordering::Relaxed),
            sheet_ready: self.sheet_ready.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            max_queue_depth: self.max_queue_depth,
        }
    }
}

/// Detailed health status information
#[derive(Debug, Clone, serde::Serialize)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Status struct intentionally has one flag per component"
)]
pub struct HealthStatus {
    pub alive: bool,
    pub ready: bool,
    pub engine_ready: bool,
    pub transport_ready: bool,
    pub sheet_ready: bool,
    pub queue_depth: u64,
    pub max_queue_depth: u64,
}
