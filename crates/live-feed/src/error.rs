//! Feed Error Types

use sse_client::SseError;
use thiserror::Error;

/// Errors raised while configuring or running a feed
#[derive(Debug, Error)]
pub enum FeedError {
    /// Configuration sources could not be read
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// No API base URL was supplied
    #[error("API base URL is not configured (set {}_API_BASE_URL)", crate::ENV_PREFIX)]
    MissingBaseUrl,

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stream transport could not be created
    #[error("Transport error: {0}")]
    Transport(#[from] SseError),

    /// REST request to the alert server failed
    #[error("API request failed: {0}")]
    Api(String),

    /// The feed task panicked or was cancelled
    #[error("Feed task failed: {0}")]
    Task(String),
}
