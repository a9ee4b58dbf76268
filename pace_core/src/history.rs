//! Read-only derivations over a user's event history.
//!
//! These feed periodic notifications and status screens: the weekly
//! report, inactivity pings, today's count and overall progress.

use crate::rules;
use crate::{SmokingEvent, User};
use chrono::{DateTime, Duration, Utc};

pub const REPORT_WINDOW_DAYS: i64 = 7;
pub const PROGRESS_BAR_BLOCKS: usize = 10;

/// Events at or after `cutoff`
pub fn events_since(events: &[SmokingEvent], cutoff: DateTime<Utc>) -> Vec<&SmokingEvent> {
    events.iter().filter(|e| e.timestamp >= cutoff).collect()
}

/// Summary of the last seven days against the user's baseline
#[derive(Clone, Debug, PartialEq)]
pub struct WeeklyReport {
    pub smoked: u32,
    pub planned: u32,
    pub not_smoked: u32,
    pub spent: f64,
    pub saved: f64,
}

pub fn weekly_report(user: &User, events: &[SmokingEvent], now: DateTime<Utc>) -> WeeklyReport {
    let cutoff = now - Duration::days(REPORT_WINDOW_DAYS);
    let smoked = events_since(events, cutoff).len() as u32;
    let planned = user.cigarettes_per_day * REPORT_WINDOW_DAYS as u32;
    let not_smoked = planned.saturating_sub(smoked);

    WeeklyReport {
        smoked,
        planned,
        not_smoked,
        spent: f64::from(smoked) * user.cigarette_cost,
        saved: f64::from(not_smoked) * user.cigarette_cost,
    }
}

/// A check-in for a user who has been quiet for a while
#[derive(Clone, Debug, PartialEq)]
pub struct InactivityPing {
    /// `None` when the user has never registered an event
    pub inactive_for: Option<Duration>,
    pub avoided_cigarettes: u64,
    pub saved: f64,
}

/// Decide whether a user is due an inactivity ping.
///
/// Users with no events are always inactive. A ping already sent within the
/// threshold suppresses another one.
pub fn inactivity_ping(
    user: &User,
    last_event: Option<&SmokingEvent>,
    last_ping: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold_hours: i64,
) -> Option<InactivityPing> {
    let threshold = Duration::hours(threshold_hours);
    let inactivity = match last_event {
        Some(event) => now - event.timestamp,
        None => threshold + Duration::seconds(1),
    };

    if inactivity < threshold {
        return None;
    }
    if let Some(pinged) = last_ping {
        if now - pinged < threshold {
            return None;
        }
    }

    let avoided = (inactivity.num_minutes().max(0) as u64) / u64::from(user.interval_minutes.max(1));
    Some(InactivityPing {
        inactive_for: last_event.map(|_| inactivity),
        avoided_cigarettes: avoided,
        saved: avoided as f64 * user.cigarette_cost,
    })
}

/// Today's count (UTC date) against the daily baseline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailySummary {
    pub smoked_today: u32,
    pub plan_today: u32,
}

pub fn daily_summary(user: &User, events: &[SmokingEvent], now: DateTime<Utc>) -> DailySummary {
    let today = now.date_naive();
    let smoked_today = events
        .iter()
        .filter(|e| e.timestamp.date_naive() == today)
        .count() as u32;
    DailySummary {
        smoked_today,
        plan_today: user.cigarettes_per_day,
    }
}

/// How far the interval has moved from the onboarding interval, in [0, 1].
///
/// The ratio is `1 - interval / initial`, so it only
/// rises above zero if the interval ever drops below the starting point.
pub fn progress_ratio(user: &User) -> f64 {
    let initial = f64::from(rules::initial_interval(user.cigarettes_per_day));
    (1.0 - f64::from(user.interval_minutes) / initial).clamp(0.0, 1.0)
}

/// Render a ratio as filled and empty blocks
pub fn progress_bar(ratio: f64, blocks: usize) -> String {
    let filled = ((ratio.clamp(0.0, 1.0) * blocks as f64) as usize).min(blocks);
    format!("{}{}", "#".repeat(filled), "-".repeat(blocks - filled))
}

/// Whether a front-end should still offer undo for this event
pub fn undo_available(last_event: Option<&SmokingEvent>, now: DateTime<Utc>) -> bool {
    match last_event {
        Some(event) => event.id.is_some() && rules::within_undo_window(event.timestamp, now),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{sample_event, sample_user, t0};
    use crate::EventId;

    #[test]
    fn test_weekly_report() {
        let user = sample_user(1);
        let now = t0() + Duration::days(8);
        let events = vec![
            sample_event(1, 0),                     // 8 days ago, outside
            sample_event(1, 2 * 24 * 60),
            sample_event(1, 5 * 24 * 60),
            sample_event(1, 8 * 24 * 60 - 30),
        ];

        let report = weekly_report(&user, &events, now);
        assert_eq!(report.smoked, 3);
        assert_eq!(report.planned, 140);
        assert_eq!(report.not_smoked, 137);
        assert_eq!(report.spent, 3.0);
        assert_eq!(report.saved, 137.0);
    }

    #[test]
    fn test_weekly_report_over_plan_saves_nothing() {
        let mut user = sample_user(1);
        user.cigarettes_per_day = 0;
        let events = vec![sample_event(1, 0)];
        let report = weekly_report(&user, &events, t0());
        assert_eq!(report.not_smoked, 0);
        assert_eq!(report.saved, 0.0);
    }

    #[test]
    fn test_recently_active_gets_no_ping() {
        let user = sample_user(1);
        let event = sample_event(1, 0);
        let now = t0() + Duration::hours(11);
        assert!(inactivity_ping(&user, Some(&event), None, now, 12).is_none());
    }

    #[test]
    fn test_inactive_user_ping() {
        let user = sample_user(1);
        let event = sample_event(1, 0);
        let now = t0() + Duration::hours(12);

        let ping = inactivity_ping(&user, Some(&event), None, now, 12).unwrap();
        assert_eq!(ping.inactive_for, Some(Duration::hours(12)));
        // 720 minutes at a 72 minute interval
        assert_eq!(ping.avoided_cigarettes, 10);
        assert_eq!(ping.saved, 10.0);
    }

    #[test]
    fn test_recent_ping_suppresses_another() {
        let user = sample_user(1);
        let now = t0() + Duration::hours(30);
        let pinged = now - Duration::hours(3);
        assert!(inactivity_ping(&user, None, Some(pinged), now, 12).is_none());
        assert!(inactivity_ping(&user, None, Some(now - Duration::hours(13)), now, 12).is_some());
    }

    #[test]
    fn test_never_smoked_is_inactive() {
        let user = sample_user(1);
        let ping = inactivity_ping(&user, None, None, t0(), 12).unwrap();
        assert_eq!(ping.inactive_for, None);
        assert_eq!(ping.avoided_cigarettes, 10);
    }

    #[test]
    fn test_daily_summary_uses_utc_date() {
        let user = sample_user(1);
        // t0 is 08:00; events at 08:00, 23:00 same day, and 00:30 next day
        let events = vec![
            sample_event(1, 0),
            sample_event(1, 15 * 60),
            sample_event(1, 16 * 60 + 30),
        ];
        let summary = daily_summary(&user, &events, t0() + Duration::hours(2));
        assert_eq!(summary, DailySummary { smoked_today: 2, plan_today: 20 });
    }

    #[test]
    fn test_progress() {
        let mut user = sample_user(1);
        assert_eq!(progress_ratio(&user), 0.0);
        user.interval_minutes = 36;
        assert_eq!(progress_ratio(&user), 0.5);
        assert_eq!(progress_bar(0.5, PROGRESS_BAR_BLOCKS), "#####-----");
        user.interval_minutes = 200;
        assert_eq!(progress_ratio(&user), 0.0);
        assert_eq!(progress_bar(2.0, 4), "####");
    }

    #[test]
    fn test_undo_available() {
        let mut event = sample_event(1, 0);
        assert!(!undo_available(Some(&event), t0()));
        event.id = Some(EventId(1));
        assert!(undo_available(Some(&event), t0() + Duration::minutes(10)));
        assert!(!undo_available(Some(&event), t0() + Duration::minutes(11)));
        assert!(!undo_available(None, t0()));
    }
}
