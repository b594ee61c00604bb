//! Event Transport Abstraction

use crate::error::SseError;
use crate::event::SseEvent;
use async_trait::async_trait;
use std::time::Duration;

/// A reconnectable source of server-sent events
///
/// The consumer drives reconnection: after `next_event` returns `Ok(None)` or
/// a retryable error it may call `open` again. `close` is terminal.
#[async_trait]
pub trait EventTransport: Send {
    /// Open the stream, replacing any previous connection
    async fn open(&mut self) -> Result<(), SseError>;

    /// Read the next complete event
    ///
    /// Returns `Ok(None)` when the server ends the stream.
    async fn next_event(&mut self) -> Result<Option<SseEvent>, SseError>;

    /// Reconnection time requested by the server, if any
    fn reconnection_time(&self) -> Option<Duration>;

    /// Release the connection
    fn close(&mut self);
}
