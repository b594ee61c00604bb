//! Event Stream Error Types

use thiserror::Error;

/// Errors that can occur while opening or reading an event stream
#[derive(Debug, Error)]
pub enum SseError {
    /// URL could not be parsed
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(String),

    /// Request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Server answered with something other than an event stream
    #[error("Unexpected content type: {0}")]
    ContentType(String),

    /// Response body failed mid-stream
    #[error("Stream body error: {0}")]
    Body(String),

    /// Read attempted without an open connection
    #[error("Event stream is not connected")]
    NotConnected,
}

impl SseError {
    /// Whether reconnecting may succeed
    ///
    /// Bad status, bad content type and a bad URL fail the connection for good.
    pub fn is_retryable(&self) -> bool {
        match self {
            SseError::Http(_) | SseError::Body(_) | SseError::NotConnected => true,
            SseError::InvalidUrl(_) | SseError::Status(_) | SseError::ContentType(_) => false,
        }
    }
}
