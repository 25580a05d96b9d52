//! Compiler configuration.

use std::time::Duration;

use kindling_codegen::DEFAULT_ADDRESS;
use kindling_optimizer::PlotTier;
use serde::{Deserialize, Serialize};

/// Where compiled templates go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Give commands and a combined artifact for manual import.
    #[default]
    Offline,
    /// Send templates to the companion client.
    Live,
}

/// How much of an error to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorDetail {
    #[default]
    Short,
    Full,
}

/// Companion client connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub address: String,
    pub ack_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            ack_timeout_ms: 5000,
        }
    }
}

impl SessionConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    pub tier: PlotTier,
    pub delivery: DeliveryMode,
    /// Log every stage and print the formatted templates.
    pub verbose: bool,
    pub error_detail: ErrorDetail,
    pub session: SessionConfig,
}

impl CompileConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Default log level for this configuration.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}
