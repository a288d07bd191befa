use chrono::{DateTime, Duration, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole days elapsed between `earlier` and `later`, never negative.
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_days().max(0)
}

/// `at` shifted back by `days`, or `None` when the result leaves chrono's range.
pub fn days_before(at: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|d| at.checked_sub_signed(d))
}

/// `at` shifted forward by `days`, or `None` when the result leaves chrono's range.
pub fn days_after(at: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|d| at.checked_add_signed(d))
}

/// Adds calendar-agnostic months (30.44 days each), matching how tenure is counted.
/// `None` when the result is not representable.
pub fn add_months(start: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    let seconds = (f64::from(months) * SECONDS_PER_MONTH).round() as i64;
    Duration::try_seconds(seconds).and_then(|d| start.checked_add_signed(d))
}

pub fn months_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    ((later - earlier).num_seconds().max(0) as f64) / SECONDS_PER_MONTH
}

const SECONDS_PER_MONTH: f64 = 30.436_875 * 24.0 * 3600.0;
