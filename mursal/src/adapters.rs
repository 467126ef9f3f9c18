//! Built-in collaborator adapters
//!
//! Production deployments implement [`SheetSource`] and [`ChatTransport`]
//! against the real spreadsheet SDK and chat session and hand them to
//! [`crate::Mursal::run_with`]. The adapters here cover local operation:
//! a JSON-file order book and a dry-run transport that logs instead of
//! sending.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use mursal_common::{CanonicalPhone, OrderRow};
use mursal_engine::{ChatTransport, SendOutcome, SheetSource};
use mursal_resilience::OutboundError;
use serde::{Deserialize, Serialize};

/// Which sheet-source adapter to build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SheetAdapterConfig {
    /// A local JSON file holding an array of order rows.
    JsonFile { path: String },
}

impl Default for SheetAdapterConfig {
    fn default() -> Self {
        Self::JsonFile {
            path: "./config/orders.json".to_string(),
        }
    }
}

/// Which transport adapter to build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum TransportAdapterConfig {
    /// Log every message instead of delivering it.
    #[default]
    DryRun,
}

/// Build the configured sheet source.
pub fn build_sheet(config: &SheetAdapterConfig) -> Arc<dyn SheetSource> {
    match config {
        SheetAdapterConfig::JsonFile { path } => Arc::new(JsonFileSheetSource::new(path)),
    }
}

/// Build the configured transport.
pub fn build_transport(config: &TransportAdapterConfig) -> Arc<dyn ChatTransport> {
    match config {
        TransportAdapterConfig::DryRun => Arc::new(DryRunTransport),
    }
}

/// Order book read from a local JSON file on every poll.
pub struct JsonFileSheetSource {
    path: PathBuf,
}

impl JsonFileSheetSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SheetSource for JsonFileSheetSource {
    async fn fetch_rows(&self) -> Result<Vec<OrderRow>, OutboundError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| OutboundError::from_io(&e))?;

        let mut rows: Vec<OrderRow> = serde_json::from_slice(&bytes)
            .map_err(|e| OutboundError::Permanent(format!("order file malformed: {e}")))?;

        // Rows without an explicit index get their sheet position,
        // 1-based with the header counted.
        for (i, row) in rows.iter_mut().enumerate() {
            if row.row_index == 0 {
                row.row_index = u32::try_from(i).unwrap_or(u32::MAX).saturating_add(2);
            }
        }

        Ok(rows)
    }
}

/// Transport that logs deliveries instead of performing them.
pub struct DryRunTransport;

#[async_trait]
impl ChatTransport for DryRunTransport {
    async fn is_connected(&self) -> bool {
        true
    }

    async fn send(&self, phone: &CanonicalPhone, body: &str) -> Result<SendOutcome, OutboundError> {
        tracing::info!(phone = %phone, body, "DRY RUN: message not actually sent");
        Ok(SendOutcome::Delivered)
    }
}
