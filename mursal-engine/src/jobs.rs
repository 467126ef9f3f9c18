//! Job payloads

use mursal_common::{CanonicalPhone, MessageKind};
use serde::{Deserialize, Serialize};

/// An immediate outbound message, fully rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageJob {
    /// Canonical destination number.
    pub phone: CanonicalPhone,
    /// Rendered message body.
    pub body: String,
    /// Stable order key, the guard's primary coordinate.
    pub order_id: String,
    /// Source row position, for log correlation only.
    pub row_index: u32,
    /// Customer name, carried so a delivered send records the guard's
    /// name key alongside order and phone.
    pub customer_name: String,
    /// Message class.
    pub kind: MessageKind,
}

/// A delayed nudge for an order that has not progressed.
///
/// Carries the status observed at scheduling time; the worker re-reads
/// the sheet before firing and drops the reminder if the status moved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderJob {
    pub order_id: String,
    pub row_index: u32,
    pub phone: CanonicalPhone,
    pub customer_name: String,
    /// Order status captured when the reminder was scheduled.
    pub status: String,
}

/// A delayed discounted follow-up for a rejected order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedOfferJob {
    pub order_id: String,
    pub row_index: u32,
    pub phone: CanonicalPhone,
    pub customer_name: String,
    /// Order status captured when the offer was scheduled.
    pub status: String,
    /// Original order amount captured at scheduling time.
    pub amount: f64,
}
