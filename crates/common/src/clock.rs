//! Wall-clock helpers.
//!
//! Reconciliation compares entry timestamps at whole-second resolution, so
//! every timestamp in the system is UTC unix seconds.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current UTC wall clock as unix seconds.
pub fn now_unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
