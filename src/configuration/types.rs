use std::time::Duration;

use serde::Deserialize;

use crate::feed::ReconnectPolicy;

/// Where records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Subscribe to the backend's event feed.
    Live,
    /// Load one static snapshot.
    Batch,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub delay_ms: u64,
    /// Omitted means retry forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            delay_ms: 3000,
            max_attempts: None,
        }
    }
}

impl ReconnectSettings {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            delay: Duration::from_millis(self.delay_ms),
            max_attempts: self.max_attempts,
        }
    }
}
