//! Timestamp capture
//!
//! Timestamps are monotonic UTC and appear on every boundary-visible
//! record. They are never used for correctness: only for ordering
//! (latest-record queries) and decay.

use chrono::{DateTime, Utc};

/// UTC timestamp with nanosecond resolution
pub type Timestamp = DateTime<Utc>;

/// Capture the current UTC time
pub fn now() -> Timestamp {
    Utc::now()
}
