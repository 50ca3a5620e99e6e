//! Decoding of inbound stream messages.

use super::error::StreamError;
use super::types::StreamUpdate;

/// Parse one inbound message into a frame and stats pair.
///
/// Both fields must be present and well-formed; a message carrying only one
/// of them is rejected as a whole.
pub fn parse_message(text: &str) -> Result<StreamUpdate, StreamError> {
    serde_json::from_str::<StreamUpdate>(text).map_err(|e| StreamError::Malformed(e.to_string()))
}
