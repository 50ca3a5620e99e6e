//! Error types for backend requests.

use thiserror::Error;

/// Errors returned by [`BackendClient`](super::BackendClient) requests.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network connectivity error (DNS, connection refused, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded its deadline
    #[error("Request timeout after {0}s")]
    Timeout(u64),

    /// Backend returned an error status
    #[error("Backend error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Local file could not be read for upload
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configured backend address is unusable
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Classify a reqwest error.
    pub fn from_reqwest(e: reqwest::Error, timeout_seconds: u64) -> Self {
        if e.is_timeout() {
            ClientError::Timeout(timeout_seconds)
        } else if e.is_decode() {
            ClientError::InvalidResponse(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}
