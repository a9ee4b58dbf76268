//! Short-lived per-user session state.
//!
//! Pending alternative tasks and inactivity ping times are not part of the
//! durable profile. They live in an explicit `SessionState` keyed by user
//! identity, which front-ends may keep in memory or persist between runs.

use crate::config::AlternativesConfig;
use crate::engine::{availability, register_event};
use crate::state::{read_json, write_json_atomic};
use crate::store::{EventStore, UserStore};
use crate::{Availability, Error, Result, SmokingEvent, User, UserId};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Only offer a longer wait when this close to the allowed time
pub const DELAY_OFFER_WINDOW_SECONDS: u64 = 5 * 60;
/// At most one delay offer per this many hours
pub const DELAY_OFFER_THROTTLE_HOURS: i64 = 3;
pub const DELAY_OFFER_MINUTES: [u32; 6] = [5, 10, 15, 20, 25, 30];

/// An alternative task offered instead of an early cigarette
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PendingAlternative {
    pub task: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingAlternative {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub pending_alternatives: BTreeMap<UserId, PendingAlternative>,
    #[serde(default)]
    pub last_pings: BTreeMap<UserId, DateTime<Utc>>,
}

impl SessionState {
    /// Load session state from a file.
    ///
    /// Returns default state if the file doesn't exist or is corrupted.
    pub fn load(path: &Path) -> Result<Self> {
        match read_json::<SessionState>(path) {
            Ok(Some(state)) => {
                tracing::debug!("Loaded session state from {:?}", path);
                Ok(state)
            }
            Ok(None) => Ok(Self::default()),
            Err(e) => {
                tracing::warn!(
                    "Failed to read session state {:?}: {}. Using defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)?;
        tracing::debug!("Saved session state to {:?}", path);
        Ok(())
    }

    /// The user's pending alternative, if it has not expired
    pub fn active_alternative(&self, id: UserId, now: DateTime<Utc>) -> Option<&PendingAlternative> {
        self.pending_alternatives
            .get(&id)
            .filter(|alt| alt.is_active(now))
    }

    pub fn last_ping(&self, id: UserId) -> Option<DateTime<Utc>> {
        self.last_pings.get(&id).copied()
    }

    pub fn record_ping(&mut self, id: UserId, now: DateTime<Utc>) {
        self.last_pings.insert(id, now);
    }

    /// Drop everything held for a user
    pub fn forget(&mut self, id: UserId) {
        self.pending_alternatives.remove(&id);
        self.last_pings.remove(&id);
    }
}

// ============================================================================
// "Smoking now" flow
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum SmokeOutcome {
    /// The user was allowed to act and the event was recorded
    Registered(SmokingEvent),
    /// The user gave up on a pending alternative; the event was recorded
    Relapse(SmokingEvent),
    /// Too early: an alternative task was offered instead
    AlternativeProposed {
        task: String,
        expires_at: DateTime<Utc>,
    },
    /// Too early and there is no alternative to offer
    TooEarly { seconds_left: u64 },
}

/// Handle a "smoking now" request.
///
/// An active pending alternative turns the request into a relapse, which is
/// registered. Otherwise the act is registered only if the user may act now;
/// if not, a random alternative task is proposed and nothing is registered.
pub fn smoke_now<U, E, R>(
    users: &mut U,
    events: &mut E,
    session: &mut SessionState,
    alternatives: &AlternativesConfig,
    id: UserId,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<SmokeOutcome>
where
    U: UserStore,
    E: EventStore,
    R: Rng + ?Sized,
{
    let user = users.find(id)?.ok_or(Error::NotInitialized(id))?;

    if let Some(pending) = session.pending_alternatives.remove(&id) {
        if pending.is_active(now) {
            let event = register_event(users, events, id, now)?;
            tracing::info!("User {} relapsed during alternative '{}'", id, pending.task);
            return Ok(SmokeOutcome::Relapse(event));
        }
        tracing::debug!("User {}: expired alternative dropped", id);
    }

    let answer = availability(&user, now);
    if answer.can_act {
        let event = register_event(users, events, id, now)?;
        return Ok(SmokeOutcome::Registered(event));
    }

    match alternatives.tasks.choose(rng) {
        Some(task) => {
            let expires_at = now + Duration::minutes(alternatives.expiry_minutes);
            session.pending_alternatives.insert(
                id,
                PendingAlternative {
                    task: task.clone(),
                    expires_at,
                },
            );
            tracing::info!("User {} offered alternative '{}'", id, task);
            Ok(SmokeOutcome::AlternativeProposed {
                task: task.clone(),
                expires_at,
            })
        }
        None => Ok(SmokeOutcome::TooEarly {
            seconds_left: answer.seconds_left,
        }),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AlternativeOutcome {
    /// Task done in time; the allowed time moved later by the bonus
    Completed { next_allowed_time: DateTime<Utc> },
    /// The task window had already closed
    Expired,
    NonePending,
}

/// Mark the user's pending alternative as done.
///
/// A task finished in time pushes `next_allowed_time` (or `now` if unset)
/// later by `alternatives.bonus_minutes`.
pub fn complete_alternative<U: UserStore>(
    users: &mut U,
    session: &mut SessionState,
    alternatives: &AlternativesConfig,
    id: UserId,
    now: DateTime<Utc>,
) -> Result<AlternativeOutcome> {
    let mut user = users.find(id)?.ok_or(Error::NotInitialized(id))?;

    let pending = match session.pending_alternatives.remove(&id) {
        Some(pending) => pending,
        None => return Ok(AlternativeOutcome::NonePending),
    };
    if !pending.is_active(now) {
        return Ok(AlternativeOutcome::Expired);
    }

    let next = user.next_allowed_time.unwrap_or(now) + Duration::minutes(alternatives.bonus_minutes);
    user.next_allowed_time = Some(next);
    users.save(&user)?;

    tracing::info!("User {} completed '{}', next allowed at {}", id, pending.task, next);
    Ok(AlternativeOutcome::Completed {
        next_allowed_time: next,
    })
}

// ============================================================================
// Delay offers
// ============================================================================

/// Is a "wait a bit longer" offer allowed right now?
///
/// Only when the user cannot act yet, the allowed time is at most five
/// minutes away, and no offer was made in the last three hours.
pub fn delay_offer_due(user: &User, answer: Availability, now: DateTime<Utc>) -> bool {
    if answer.can_act || answer.seconds_left == 0 || answer.seconds_left > DELAY_OFFER_WINDOW_SECONDS {
        return false;
    }
    match user.last_delay_offer {
        Some(last) => now - last > Duration::hours(DELAY_OFFER_THROTTLE_HOURS),
        None => true,
    }
}

/// Occasionally suggest an extra wait, stamping `last_delay_offer` when one is made.
///
/// Returns the suggested extra minutes. The schedule itself is not changed.
pub fn offer_delay<R: Rng + ?Sized>(
    user: &mut User,
    answer: Availability,
    now: DateTime<Utc>,
    chance: f64,
    rng: &mut R,
) -> Option<u32> {
    if !delay_offer_due(user, answer, now) || !rng.gen_bool(chance) {
        return None;
    }
    let extra = *DELAY_OFFER_MINUTES.choose(rng)?;
    user.last_delay_offer = Some(now);
    Some(extra)
}
