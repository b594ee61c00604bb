//! Dispatched Event Type

use crate::DEFAULT_EVENT_TYPE;

/// A complete event dispatched by the stream parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type (`message` when the stream did not set one)
    pub event_type: String,
    /// Data lines joined with `\n`
    pub data: String,
    /// Last event id in effect when this event was dispatched
    pub last_event_id: Option<String>,
}

impl SseEvent {
    /// Create an event with the given type and data
    pub fn new(event_type: &str, data: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            data: data.to_string(),
            last_event_id: None,
        }
    }

    /// Create an unnamed (`message`) event
    pub fn message(data: &str) -> Self {
        Self::new(DEFAULT_EVENT_TYPE, data)
    }

    /// Attach a last event id
    pub fn with_id(mut self, id: &str) -> Self {
        self.last_event_id = Some(id.to_string());
        self
    }

    /// Check the event type
    pub fn is(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }
}
