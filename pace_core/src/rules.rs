//! Interval rules shared by the use cases.
//!
//! All arithmetic on intervals is integer percent math so that a grown or
//! shrunk interval is exactly reproducible (100 minutes grows to 115, not 114).

use chrono::{DateTime, Duration, Utc};

pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const MIN_INTERVAL_MINUTES: u32 = 20;
pub const MAX_INTERVAL_MINUTES: u32 = 12 * 60;

/// Grace window before the allowed time that still counts as on schedule
pub const EARLY_THRESHOLD_MINUTES: i64 = 10;
/// Early acts in a row that trigger a shrink
pub const EARLY_COUNTER_LIMIT: u32 = 3;
/// Early acts in a row from which nightly growth is paused
pub const EARLY_PAUSE_FROM: u32 = 2;
pub const GROWTH_PAUSE_DAYS: i64 = 2;
pub const SHRINK_PERCENT: u32 = 95;

/// On-schedule acts needed before the sweep grows the interval
pub const GROWTH_STREAK_THRESHOLD: u32 = 3;
pub const GROWTH_PERCENT: u32 = 115;

pub const UNDO_WINDOW_MINUTES: i64 = 10;

/// Initial interval for a daily baseline; a zero baseline is treated as one
pub fn initial_interval(cigarettes_per_day: u32) -> u32 {
    (MINUTES_PER_DAY / cigarettes_per_day.max(1)).max(MIN_INTERVAL_MINUTES)
}

pub fn cigarette_cost(price_per_pack: f64, cigarettes_per_pack: u32) -> f64 {
    price_per_pack / f64::from(cigarettes_per_pack)
}

/// Interval after repeated early acts: 5% shorter, never below the floor
pub fn shrunk_interval(interval_minutes: u32) -> u32 {
    let shrunk = (u64::from(interval_minutes) * u64::from(SHRINK_PERCENT) / 100) as u32;
    shrunk.max(MIN_INTERVAL_MINUTES)
}

/// Interval after a successful streak: 15% longer, never above the cap
pub fn grown_interval(interval_minutes: u32) -> u32 {
    let grown = u64::from(interval_minutes) * u64::from(GROWTH_PERCENT) / 100;
    grown.min(u64::from(MAX_INTERVAL_MINUTES)) as u32
}

/// Interval a user needs to reach before the daily target can drop to `target - 1`
///
/// Returns `None` when the target is already 1 or lower.
pub fn target_threshold(target_cigs_per_day: u32) -> Option<u32> {
    if target_cigs_per_day > 1 {
        Some(MINUTES_PER_DAY / (target_cigs_per_day - 1))
    } else {
        None
    }
}

/// An act is early only when it comes materially ahead of the allowed time
pub fn is_early(next_allowed_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match next_allowed_time {
        Some(allowed) => now < allowed - Duration::minutes(EARLY_THRESHOLD_MINUTES),
        None => false,
    }
}

/// Whole seconds from `now` until `until`, rounded up and floored at zero
pub fn seconds_until(until: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (until - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        ((millis + 999) / 1000) as u64
    }
}

pub fn within_undo_window(event_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - event_time <= Duration::minutes(UNDO_WINDOW_MINUTES)
}
