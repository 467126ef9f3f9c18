//! Message classification: kinds, the order-status mapping, and per-kind flags

use serde::{Deserialize, Serialize};

/// The class of outbound message fired for an order.
///
/// Each kind carries its own idempotency namespace in the duplicate guard,
/// its own template, and its own resend cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    /// A freshly placed order awaiting confirmation
    NewOrder,
    /// The customer could not be reached by phone
    NoAnswer,
    /// The order was confirmed or handed to the courier
    Shipped,
    /// The customer declined; a discounted follow-up offer applies
    RejectedOffer,
    /// Delayed nudge for an order still awaiting confirmation
    Reminder,
}

impl MessageKind {
    /// Stable wire/key name for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewOrder => "newOrder",
            Self::NoAnswer => "noAnswer",
            Self::Shipped => "shipped",
            Self::RejectedOffer => "rejectedOffer",
            Self::Reminder => "reminder",
        }
    }

    /// Minimum elapsed time after a recorded send for the same order below
    /// which no new send of this kind is attempted.
    #[must_use]
    pub const fn cooldown_secs(self) -> u64 {
        match self {
            Self::NewOrder => 1800,
            Self::NoAnswer => 3600,
            Self::Shipped => 14400,
            Self::RejectedOffer => 86400,
            Self::Reminder => 0,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw order-status cell to the message kind it fires.
///
/// The status vocabulary is the one used by Egyptian fulfilment sheets,
/// including common misspellings. Unmapped statuses fire nothing.
#[must_use]
pub fn kind_for_status(status: &str) -> Option<MessageKind> {
    match status.trim() {
        "" | "جديد" | "طلب جديد" | "قيد المراجعة" | "قيد المراجعه" | "غير محدد" => {
            Some(MessageKind::NewOrder)
        }
        "لم يتم الرد" | "لم يرد" | "لا يرد" | "عدم الرد" => Some(MessageKind::NoAnswer),
        "تم التأكيد" | "تم التاكيد" | "مؤكد" | "تم الشحن" | "قيد الشحن" => {
            Some(MessageKind::Shipped)
        }
        "تم الرفض" | "مرفوض" | "رفض الاستلام" | "رفض الأستلام" | "لم يتم الاستلام" => {
            Some(MessageKind::RejectedOffer)
        }
        _ => None,
    }
}

/// Per-kind switches controlling whether that message class may fire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "One independent switch per message kind"
)]
pub struct EnabledKinds {
    #[serde(default = "default_enabled")]
    pub new_order: bool,
    #[serde(default = "default_enabled")]
    pub no_answer: bool,
    #[serde(default = "default_enabled")]
    pub shipped: bool,
    #[serde(default = "default_enabled")]
    pub rejected_offer: bool,
    #[serde(default = "default_enabled")]
    pub reminder: bool,
}

const fn default_enabled() -> bool {
    true
}

impl Default for EnabledKinds {
    fn default() -> Self {
        Self {
            new_order: true,
            no_answer: true,
            shipped: true,
            rejected_offer: true,
            reminder: true,
        }
    }
}

impl EnabledKinds {
    /// Whether the given kind is allowed to fire.
    #[must_use]
    pub const fn allows(&self, kind: MessageKind) -> bool {
        match kind {
            MessageKind::NewOrder => self.new_order,
            MessageKind::NoAnswer => self.no_answer,
            MessageKind::Shipped => self.shipped,
            MessageKind::RejectedOffer => self.rejected_offer,
            MessageKind::Reminder => self.reminder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_status_maps_to_new_order() {
        assert_eq!(kind_for_status(""), Some(MessageKind::NewOrder));
        assert_eq!(kind_for_status("   "), Some(MessageKind::NewOrder));
    }

    #[test]
    fn test_status_variants_map_consistently() {
        for status in ["جديد", "طلب جديد", "قيد المراجعة", "قيد المراجعه", "غير محدد"] {
            assert_eq!(kind_for_status(status), Some(MessageKind::NewOrder), "{status}");
        }
        for status in ["لم يتم الرد", "لم يرد", "لا يرد", "عدم الرد"] {
            assert_eq!(kind_for_status(status), Some(MessageKind::NoAnswer), "{status}");
        }
        for status in ["تم التأكيد", "تم التاكيد", "مؤكد", "تم الشحن", "قيد الشحن"] {
            assert_eq!(kind_for_status(status), Some(MessageKind::Shipped), "{status}");
        }
        for status in [
            "تم الرفض",
            "مرفوض",
            "رفض الاستلام",
            "رفض الأستلام",
            "لم يتم الاستلام",
        ] {
            assert_eq!(
                kind_for_status(status),
                Some(MessageKind::RejectedOffer),
                "{status}"
            );
        }
    }

    #[test]
    fn test_status_is_trimmed_before_mapping() {
        assert_eq!(kind_for_status("  جديد  "), Some(MessageKind::NewOrder));
    }

    #[test]
    fn test_unmapped_status_fires_nothing() {
        assert_eq!(kind_for_status("ملغي"), None);
        assert_eq!(kind_for_status("unknown"), None);
        assert_eq!(kind_for_status("#ERROR!"), None);
    }

    #[test]
    fn test_cooldowns_follow_the_resend_table() {
        assert_eq!(MessageKind::NewOrder.cooldown_secs(), 1800);
        assert_eq!(MessageKind::NoAnswer.cooldown_secs(), 3600);
        assert_eq!(MessageKind::Shipped.cooldown_secs(), 14400);
        assert_eq!(MessageKind::RejectedOffer.cooldown_secs(), 86400);
    }

    #[test]
    fn test_enabled_kinds_default_all_on() {
        let flags = EnabledKinds::default();
        for kind in [
            MessageKind::NewOrder,
            MessageKind::NoAnswer,
            MessageKind::Shipped,
            MessageKind::RejectedOffer,
            MessageKind::Reminder,
        ] {
            assert!(flags.allows(kind));
        }
    }

    #[test]
    fn test_disabled_kind_is_not_allowed() {
        let flags = EnabledKinds {
            no_answer: false,
            ..Default::default()
        };
        assert!(!flags.allows(MessageKind::NoAnswer));
        assert!(flags.allows(MessageKind::NewOrder));
    }
}
