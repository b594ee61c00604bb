//! Feed Buffer
//!
//! Provides a bounded, newest-first list used to hold the most recent
//! entries of a live feed.

mod buffer;

pub use buffer::{FeedBuffer, DEFAULT_CAPACITY};

use thiserror::Error;

/// Buffer construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("Buffer capacity must be at least 1")]
    ZeroCapacity,
}
