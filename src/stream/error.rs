//! Error types for stream sessions.

use thiserror::Error;

/// Errors raised while establishing or reading a stream connection.
///
/// Sessions never hand these to consumers; every variant collapses into a
/// `Closed` status transition. They exist for logging and for connector
/// implementations.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// Stream address could not be built from the backend root and source
    #[error("invalid stream address: {0}")]
    InvalidAddress(String),

    /// Handshake failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection dropped after the handshake
    #[error("transport error: {0}")]
    Transport(String),

    /// Message could not be decoded into a frame and stats pair
    #[error("malformed message: {0}")]
    Malformed(String),
}
