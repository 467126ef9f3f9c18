//! Per-order observation tracking
//!
//! Process-lifetime state owned by the engine loop: what status each
//! order last showed, and when each message kind last fired for it. Loss
//! on restart is acceptable; the duplicate guard carries the durable
//! safety net.

use ahash::AHashMap;
use mursal_common::MessageKind;

/// What was last seen for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Trimmed status from the most recent successful poll.
    pub status: String,
    /// When it was seen, seconds since the Unix epoch.
    pub seen_at: u64,
}

/// Status history keyed by stable order key.
#[derive(Debug, Default)]
pub struct ObservationHistory {
    entries: AHashMap<String, Observation>,
}

impl ObservationHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last observation for an order, if it has been seen.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Observation> {
        self.entries.get(key)
    }

    /// Record the status seen in the current cycle.
    pub fn observe(&mut self, key: String, status: &str, now: u64) {
        self.entries.insert(
            key,
            Observation {
                status: status.trim().to_string(),
                seen_at: now,
            },
        );
    }

    /// Number of tracked orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Last-send timestamps enforcing per-kind resend cooldowns.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    sends: AHashMap<(String, MessageKind), u64>,
}

impl CooldownTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cooldown for `(key, kind)` has elapsed at `now`.
    #[must_use]
    pub fn allows(&self, key: &str, kind: MessageKind, now: u64) -> bool {
        self.sends
            .get(&(key.to_string(), kind))
            .is_none_or(|last| now.saturating_sub(*last) >= kind.cooldown_secs())
    }

    /// Record a send at `now`.
    pub fn record(&mut self, key: String, kind: MessageKind, now: u64) {
        self.sends.insert((key, kind), now);
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.sends.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_tracks_latest_status() {
        let mut history = ObservationHistory::new();
        assert!(history.get("A-1").is_none());

        history.observe("A-1".to_string(), " جديد ", 100);
        let obs = history.get("A-1").expect("tracked");
        assert_eq!(obs.status, "جديد");
        assert_eq!(obs.seen_at, 100);

        history.observe("A-1".to_string(), "تم الشحن", 200);
        let obs = history.get("A-1").expect("tracked");
        assert_eq!(obs.status, "تم الشحن");
        assert_eq!(obs.seen_at, 200);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_history_clear() {
        let mut history = ObservationHistory::new();
        history.observe("A-1".to_string(), "", 100);
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_cooldown_blocks_until_elapsed() {
        let mut cooldowns = CooldownTracker::new();
        let kind = MessageKind::NoAnswer; // 1 hour cooldown

        assert!(cooldowns.allows("A-1", kind, 1000));
        cooldowns.record("A-1".to_string(), kind, 1000);

        assert!(!cooldowns.allows("A-1", kind, 1000 + 3599));
        assert!(cooldowns.allows("A-1", kind, 1000 + 3600));
    }

    #[test]
    fn test_cooldowns_are_per_kind() {
        let mut cooldowns = CooldownTracker::new();
        cooldowns.record("A-1".to_string(), MessageKind::NewOrder, 1000);

        assert!(!cooldowns.allows("A-1", MessageKind::NewOrder, 1001));
        assert!(cooldowns.allows("A-1", MessageKind::Shipped, 1001));
    }
}
