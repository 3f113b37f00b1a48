//! Timestamp helpers
//!
//! All timestamps in the system are Unix nanoseconds as i64.

use chrono::Utc;

/// Current wall-clock time in Unix nanoseconds
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}
