//! Polling intervals for view-scoped resources

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Milliseconds between log fetches while the admin view is visible
    pub logs_interval_ms: u64,
    /// Milliseconds between daily aggregate fetches while the analytics view is visible
    pub analytics_interval_ms: u64,
    /// Number of log records requested per fetch
    pub logs_limit: u32,
}

impl PollingConfig {
    pub fn logs_interval(&self) -> Duration {
        Duration::from_millis(self.logs_interval_ms)
    }

    pub fn analytics_interval(&self) -> Duration {
        Duration::from_millis(self.analytics_interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            logs_interval_ms: 2000,
            analytics_interval_ms: 30_000,
            logs_limit: 50,
        }
    }
}
