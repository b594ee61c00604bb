//! Feed configuration
//!
//! Loaded from an optional file, then `ALERT_FEED_*` environment variables,
//! then the command line base URL override.

use crate::backoff::{ReconnectPolicy, DEFAULT_FIRST_DELAY_MS, DEFAULT_MAX_DELAY_MS};
use crate::error::FeedError;
use crate::{endpoint, ENV_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Live feed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Alert server base URL, e.g. `http://localhost:8080`
    pub api_base_url: String,

    /// Reconnect when the stream drops
    pub reconnect: bool,

    /// First reconnect delay (milliseconds)
    pub reconnect_initial_ms: u64,

    /// Reconnect delay cap (milliseconds)
    pub reconnect_max_ms: u64,

    /// Reconnect delay growth factor
    pub reconnect_factor: f64,

    /// Consecutive reconnect attempts before giving up
    pub max_reconnect_attempts: Option<u32>,

    /// TCP/TLS connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Seed the feed from the history endpoint before streaming
    pub backfill_history: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            reconnect: true,
            reconnect_initial_ms: DEFAULT_FIRST_DELAY_MS,
            reconnect_max_ms: DEFAULT_MAX_DELAY_MS,
            reconnect_factor: 2.0,
            max_reconnect_attempts: None,
            connect_timeout_ms: 10_000,
            backfill_history: false,
        }
    }
}

impl FeedConfig {
    /// Create a config for the given base URL with defaults elsewhere
    pub fn new(api_base_url: &str) -> Self {
        Self {
            api_base_url: api_base_url.to_string(),
            ..Default::default()
        }
    }

    /// Load from an optional file, the environment and an optional base URL
    /// override (highest precedence), then validate
    pub fn load(path: Option<&Path>, api_base_url: Option<&str>) -> Result<Self, FeedError> {
        Self::load_with_env(path, api_base_url, None)
    }

    /// Like [`FeedConfig::load`], reading `ALERT_FEED_*` variables from `env`
    /// instead of the process environment when given
    pub fn load_with_env(
        path: Option<&Path>,
        api_base_url: Option<&str>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, FeedError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );
        if let Some(url) = api_base_url {
            builder = builder.set_override("api_base_url", url)?;
        }

        let settings = builder.build()?;

        let config: FeedConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check required values and ranges
    pub fn validate(&self) -> Result<(), FeedError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(FeedError::MissingBaseUrl);
        }
        reqwest::Url::parse(base)
            .map_err(|e| FeedError::InvalidConfig(format!("api_base_url `{}`: {}", base, e)))?;

        if !(self.reconnect_factor >= 1.0 && self.reconnect_factor.is_finite()) {
            return Err(FeedError::InvalidConfig(format!(
                "reconnect_factor must be >= 1.0, got {}",
                self.reconnect_factor
            )));
        }
        if self.reconnect_max_ms < self.reconnect_initial_ms {
            return Err(FeedError::InvalidConfig(
                "reconnect_max_ms must not be below reconnect_initial_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// URL of the alert event stream
    pub fn stream_url(&self) -> String {
        self.endpoint_url(endpoint::STREAM)
    }

    /// URL of the alert history endpoint
    pub fn history_url(&self) -> String {
        self.endpoint_url(endpoint::HISTORY)
    }

    /// URL of the health endpoint
    pub fn health_url(&self) -> String {
        self.endpoint_url(endpoint::HEALTH)
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Reconnect policy described by this config
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: self.reconnect,
            first: Duration::from_millis(self.reconnect_initial_ms),
            max: Duration::from_millis(self.reconnect_max_ms),
            factor: self.reconnect_factor,
            max_attempts: self.max_reconnect_attempts,
        }
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim().trim_end_matches('/'), path)
    }
}
