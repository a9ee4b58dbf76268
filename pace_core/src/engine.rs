//! Availability checks and event registration.
//!
//! This module implements the per-act state machine:
//! - Decide whether an act is early or on schedule
//! - Charge the act and move the streak/early accumulators
//! - Shrink the interval on repeated early acts and pause growth
//! - Schedule the next allowed time

use crate::rules;
use crate::store::{EventStore, UserStore};
use crate::{Availability, Error, Result, SmokingEvent, User, UserId};
use chrono::{DateTime, Duration, Utc};

/// Can the user act at `now`, and if not, how long until they can?
pub fn availability(user: &User, now: DateTime<Utc>) -> Availability {
    match user.next_allowed_time {
        Some(allowed) if now < allowed => Availability {
            can_act: false,
            seconds_left: rules::seconds_until(allowed, now),
        },
        _ => Availability::now(),
    }
}

/// Look up the user and answer the availability question
pub fn check_availability<U: UserStore>(
    users: &U,
    id: UserId,
    now: DateTime<Utc>,
) -> Result<Availability> {
    let user = users.find(id)?.ok_or(Error::NotInitialized(id))?;
    Ok(availability(&user, now))
}

/// Apply one consumption act to the user in memory and return the new event.
///
/// ## Transition
///
/// 1. **Early?** only when more than the grace window ahead of the allowed time
/// 2. **Charge**: every act adds the cigarette cost to `spent`
/// 3. **Early act**: bump the early counter; the third in a row shrinks the
///    interval by 5% and resets the counter; any early act breaks the success
///    streak; the second in a row pauses growth for two days
/// 4. **On schedule**: reset the early counter, extend the success streak
/// 5. **Schedule**: next allowed time is now plus the (possibly new) interval
///
/// The returned event has no id yet.
pub fn apply_event(user: &mut User, now: DateTime<Utc>) -> SmokingEvent {
    let was_early = rules::is_early(user.next_allowed_time, now);

    let event = SmokingEvent {
        id: None,
        user_id: user.id,
        timestamp: now,
        planned_time: user.next_allowed_time.unwrap_or(now),
        was_early,
        interval_before: user.interval_minutes,
    };

    user.spent += user.cigarette_cost;

    if was_early {
        user.early_counter += 1;
        if user.early_counter >= rules::EARLY_COUNTER_LIMIT {
            let shrunk = rules::shrunk_interval(user.interval_minutes);
            tracing::info!(
                "User {}: {} early acts, interval {} -> {} min",
                user.id,
                user.early_counter,
                user.interval_minutes,
                shrunk
            );
            user.set_interval(shrunk, now);
            user.early_counter = 0;
        }

        user.days_success_streak = 0;
        if user.early_counter >= rules::EARLY_PAUSE_FROM {
            let until = now.date_naive() + Duration::days(rules::GROWTH_PAUSE_DAYS);
            tracing::debug!("User {}: growth paused until {}", user.id, until);
            user.growth_pause_until = Some(until);
        }
    } else {
        user.early_counter = 0;
        user.days_success_streak += 1;
    }

    user.next_allowed_time = Some(now + user.interval());
    event
}

/// Register a consumption act for `id` at `now`.
///
/// Persists the user first, then the event. Not idempotent: a retried call
/// charges and schedules a second act.
pub fn register_event<U: UserStore, E: EventStore>(
    users: &mut U,
    events: &mut E,
    id: UserId,
    now: DateTime<Utc>,
) -> Result<SmokingEvent> {
    let mut user = users.find(id)?.ok_or(Error::NotInitialized(id))?;

    let event = apply_event(&mut user, now);

    users.save(&user)?;
    let stored = events.append(event)?;

    tracing::info!(
        "Registered event for user {} (early: {}), next allowed at {}",
        id,
        stored.was_early,
        user.next_allowed_time.map(|t| t.to_rfc3339()).unwrap_or_default()
    );
    Ok(stored)
}
