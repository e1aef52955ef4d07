//! Wall-clock helpers.

use chrono::Utc;

/// Current unix time in whole seconds
pub fn now_unix() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
