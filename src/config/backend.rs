//! Backend connection configuration

use serde::{Deserialize, Serialize};

/// Address of the traffic-sensing backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Root address; stream, upload and query endpoints hang off it
    pub url: String,
    /// Timeout for request/response calls
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            timeout_seconds: 30,
        }
    }
}
