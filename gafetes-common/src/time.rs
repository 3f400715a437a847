//! Timestamp utilities

use chrono::{DateTime, Local, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Filename-safe local timestamp, e.g. `20251018_142501`
pub fn file_stamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y%m%d_%H%M%S").to_string()
}

/// Local timestamp for console banners, e.g. `2025-10-18 14:25:01`
pub fn display_stamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
