//! Server-Sent Events Client
//!
//! This crate provides an incremental parser for the `text/event-stream`
//! format and an async HTTP transport that reads named events from a
//! long-lived response.

mod client;
mod error;
mod event;
mod parser;
mod transport;

pub use client::{HttpTransport, HttpTransportConfig};
pub use error::SseError;
pub use event::SseEvent;
pub use parser::{SseParser, MAX_LINE_BYTES};
pub use transport::EventTransport;

/// Header constants
pub mod header {
    /// Media type of an event stream
    pub const EVENT_STREAM: &str = "text/event-stream";
    /// Request header carrying the last seen event id on reconnect
    pub const LAST_EVENT_ID: &str = "Last-Event-ID";
}

/// Event type used when the stream does not name one
pub const DEFAULT_EVENT_TYPE: &str = "message";
