//! Fixed sentinels and instant arithmetic shared by every module that
//! reasons about town validity intervals.

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// First instant any town can be valid from — the root of the registry.
pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1942, 1, 1).expect("valid calendar date")
}

/// `start_date` at midnight.
pub fn start_datetime() -> NaiveDateTime {
    start_date().and_hms_opt(0, 0, 0).expect("valid time")
}

/// Conventional "still valid" sentinel. Distinct from a real calendar
/// upper bound: nothing in the registry is expected to outlive it, so
/// [`checked_add_delta`] treats it as the point past which no further
/// instant exists.
pub fn end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 1, 1).expect("valid calendar date")
}

/// `end_date` at midnight.
pub fn end_datetime() -> NaiveDateTime {
    end_date().and_hms_opt(0, 0, 0).expect("valid time")
}

/// The minimal instant granularity: adjacent closed intervals abut by
/// exactly one microsecond.
pub fn delta() -> Duration {
    Duration::microseconds(1)
}

/// `dt + delta()`, unless `dt` has already reached [`end_datetime`], in
/// which case there is no further instant to report and the caller must
/// fall back to `dt` itself (see the successor-integrity invariant).
pub fn checked_add_delta(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    if dt >= end_datetime() {
        None
    } else {
        Some(dt + delta())
    }
}

/// `fr:commune:<depcom>@<start_date iso>` — the pure function that
/// derives a version's identity from its administrative code and the
/// date its validity begins.
pub fn compute_id(depcom: &str, start: NaiveDate) -> String {
    format!("fr:commune:{}@{}", depcom, start.format("%Y-%m-%d"))
}
