//! Alert Records
//!
//! Provides the risk alert record pushed by the alert server, a validated
//! decode step for untrusted JSON payloads, and placeholder-aware rendering.

mod decode;
mod record;
mod render;

pub use decode::DecodeError;
pub use record::{AlertRecord, RiskScore};
pub use render::{render_feed, EMPTY_FEED_MESSAGE, FEED_TITLE, PLACEHOLDER, REASON_SEPARATOR};
