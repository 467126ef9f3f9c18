//! Operation families
//!
//! A family is a named group of outbound operations that share one circuit
//! breaker, one retry policy, and one set of counters.

use serde::{Deserialize, Serialize};

/// The outbound operation families the service performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationFamily {
    /// Order-book snapshot fetches
    SheetRead,
    /// Chat transport deliveries
    MessageSend,
}

impl OperationFamily {
    /// Every family, for stats and health aggregation.
    pub const ALL: [Self; 2] = [Self::SheetRead, Self::MessageSend];

    /// Stable name used in logs and wire responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SheetRead => "sheet-read",
            Self::MessageSend => "message-send",
        }
    }
}

impl std::fmt::Display for OperationFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
