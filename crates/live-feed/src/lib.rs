//! Live Alert Feed
//!
//! Subscribes to the alert server's event stream and keeps the newest 50
//! alerts for display. The feed owns its connection for the lifetime of a
//! [`FeedHandle`]: closing or dropping the handle releases it.

mod api;
mod backoff;
mod config;
mod error;
mod feed;

pub use api::ApiClient;
pub use backoff::ReconnectPolicy;
pub use config::FeedConfig;
pub use error::FeedError;
pub use feed::{FeedHandle, FeedSnapshot, FeedState, FeedStats, LiveAlertFeed};

/// Number of alerts retained by a feed
pub const FEED_CAPACITY: usize = feed_buffer::DEFAULT_CAPACITY;

/// Event type carrying alert payloads
pub const ALERT_EVENT: &str = "alert";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "ALERT_FEED";

/// Alert server endpoints, relative to the API base URL
pub mod endpoint {
    /// Live alert event stream
    pub const STREAM: &str = "/api/stream/alerts";
    /// Last alerts, oldest first
    pub const HISTORY: &str = "/api/alerts";
    /// Liveness probe
    pub const HEALTH: &str = "/api/health";
}
