//! Incremental `text/event-stream` Parser
//!
//! Bytes are fed as they arrive from the network. Lines may end in `\r\n`,
//! `\n` or `\r`, and any line or UTF-8 sequence may be split across chunks.

use crate::event::SseEvent;
use crate::DEFAULT_EVENT_TYPE;
use std::time::Duration;
use tracing::warn;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Longest line kept; longer lines are discarded whole
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Stream parser state
#[derive(Debug, Default)]
pub struct SseParser {
    /// Bytes of the line being read
    line: Vec<u8>,
    /// Current line passed `MAX_LINE_BYTES` and is being skipped
    overflowed: bool,
    /// Previous chunk ended in `\r`; a leading `\n` belongs to it
    skip_lf: bool,
    /// First line processed (BOM already handled)
    started: bool,
    /// Pending event type
    event_type: String,
    /// Pending data lines, each followed by `\n`
    data: String,
    /// Last event id, kept across events and reconnects
    last_event_id: String,
    /// Reconnection time announced by the server
    retry: Option<Duration>,
}

impl SseParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the response body, returning the events it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();

        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }

            match byte {
                b'\n' => self.end_line(&mut events),
                b'\r' => {
                    self.end_line(&mut events);
                    self.skip_lf = true;
                }
                _ if self.overflowed => {}
                _ if self.line.len() >= MAX_LINE_BYTES => {
                    warn!("Event stream line exceeds {} bytes, discarding", MAX_LINE_BYTES);
                    self.overflowed = true;
                    self.line = Vec::new();
                }
                _ => self.line.push(byte),
            }
        }

        events
    }

    /// Drop partial state before reading a new connection
    ///
    /// The last event id and reconnection time survive.
    pub fn reset(&mut self) {
        self.line.clear();
        self.overflowed = false;
        self.skip_lf = false;
        self.started = false;
        self.event_type.clear();
        self.data.clear();
    }

    /// Last event id seen, if any
    pub fn last_event_id(&self) -> Option<&str> {
        if self.last_event_id.is_empty() {
            None
        } else {
            Some(&self.last_event_id)
        }
    }

    /// Reconnection time set by a `retry:` field
    pub fn reconnection_time(&self) -> Option<Duration> {
        self.retry
    }

    fn end_line(&mut self, events: &mut Vec<SseEvent>) {
        if self.overflowed {
            self.overflowed = false;
            self.started = true;
            return;
        }

        let mut line = std::mem::take(&mut self.line);
        if !self.started {
            self.started = true;
            if line.starts_with(BOM) {
                line.drain(..BOM.len());
            }
        }

        let text = String::from_utf8_lossy(&line);
        self.process_line(&text, events);

        // Reuse the allocation for the next line
        line.clear();
        self.line = line;
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<SseEvent>) {
        if line.is_empty() {
            self.dispatch(events);
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.find(':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                (&line[..idx], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "event" => self.event_type = value.to_string(),
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "id" => {
                if !value.contains('\0') {
                    self.last_event_id = value.to_string();
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(ms) = value.parse::<u64>() {
                        self.retry = Some(Duration::from_millis(ms));
                    }
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, events: &mut Vec<SseEvent>) {
        let event_type = std::mem::take(&mut self.event_type);
        if self.data.is_empty() {
            return;
        }

        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }

        events.push(SseEvent {
            event_type: if event_type.is_empty() {
                DEFAULT_EVENT_TYPE.to_string()
            } else {
                event_type
            },
            data,
            last_event_id: self.last_event_id().map(str::to_string),
        });
    }
}
