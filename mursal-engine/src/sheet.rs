//! Order-book source

use async_trait::async_trait;
use mursal_common::OrderRow;
use mursal_resilience::OutboundError;

/// Read-only view of the spreadsheet order book.
///
/// Implementations wrap the spreadsheet SDK and deliver rows in sheet
/// order, header excluded, with 1-based row indices. Cells holding
/// formula errors arrive as their literal text; downstream parsing is
/// expected to tolerate them.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Fetch the current snapshot of every order row.
    ///
    /// # Errors
    ///
    /// Returns a classified [`OutboundError`] so the resilience wrapper
    /// can decide whether to retry.
    async fn fetch_rows(&self) -> Result<Vec<OrderRow>, OutboundError>;
}
