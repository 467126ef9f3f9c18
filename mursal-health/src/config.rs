//! Health server configuration

use serde::{Deserialize, Serialize};

/// Configuration for the health probe server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Address to bind the probe server to.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Queue depth above which readiness fails.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: u64,
}

fn default_listen_address() -> String {
    "127.0.0.1:8900".to_string()
}

const fn default_max_queue_depth() -> u64 {
    10_000
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            max_queue_depth: default_max_queue_depth(),
        }
    }
}
