//! HTTP Event Stream Client
//!
//! Provides a reqwest-backed transport reading `text/event-stream` responses.

use crate::error::SseError;
use crate::event::SseEvent;
use crate::header::{EVENT_STREAM, LAST_EVENT_ID};
use crate::parser::SseParser;
use crate::transport::EventTransport;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode, Url};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for establishing the TCP/TLS connection
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// HTTP transport configuration
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Full URL of the event stream
    pub url: String,
    /// Connect timeout (the stream itself has no read timeout)
    pub connect_timeout: Duration,
}

impl HttpTransportConfig {
    /// Create a config for the given stream URL
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }
}

/// Event stream transport over a long-lived HTTP GET
pub struct HttpTransport {
    /// HTTP client
    client: Client,
    /// Stream URL
    url: Url,
    /// Open response, if connected
    response: Option<Response>,
    /// Wire parser (keeps last event id across reconnects)
    parser: SseParser,
    /// Events parsed but not yet returned
    pending: VecDeque<SseEvent>,
}

impl HttpTransport {
    /// Create a new transport; no connection is made until `open`
    pub fn new(config: HttpTransportConfig) -> Result<Self, SseError> {
        let url = Url::parse(&config.url)
            .map_err(|e| SseError::InvalidUrl(format!("{}: {}", config.url, e)))?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        info!("Creating event stream transport for {}", url);

        Ok(Self {
            client,
            url,
            response: None,
            parser: SseParser::new(),
            pending: VecDeque::new(),
        })
    }

    /// Stream URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Check if a response is open
    pub fn is_connected(&self) -> bool {
        self.response.is_some()
    }
}

#[async_trait]
impl EventTransport for HttpTransport {
    async fn open(&mut self) -> Result<(), SseError> {
        self.response = None;
        self.pending.clear();
        self.parser.reset();

        let mut request = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache");
        if let Some(id) = self.parser.last_event_id() {
            debug!("Resuming after event id {}", id);
            request = request.header(LAST_EVENT_ID, id);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() || status == StatusCode::NO_CONTENT {
            return Err(SseError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let media_type = content_type.split(';').next().unwrap_or("").trim();
        if !media_type.eq_ignore_ascii_case(EVENT_STREAM) {
            return Err(SseError::ContentType(content_type));
        }

        info!("Event stream connected: {}", self.url);
        self.response = Some(response);
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<SseEvent>, SseError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            let response = self.response.as_mut().ok_or(SseError::NotConnected)?;
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let events = self.parser.feed(&chunk);
                    self.pending.extend(events);
                }
                Ok(None) => {
                    debug!("Event stream ended by server");
                    self.response = None;
                    return Ok(None);
                }
                Err(e) => {
                    self.response = None;
                    return Err(SseError::Body(e.to_string()));
                }
            }
        }
    }

    fn reconnection_time(&self) -> Option<Duration> {
        self.parser.reconnection_time()
    }

    fn close(&mut self) {
        if self.response.take().is_some() {
            info!("Closing event stream: {}", self.url);
        }
        self.pending.clear();
    }
}
