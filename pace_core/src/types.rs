//! Core domain types for the interval tracker.
//!
//! This module defines the fundamental records used throughout the system:
//! - User identities and behavioral profiles
//! - Smoking events (the append-mostly log)
//! - Availability answers

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identities
// ============================================================================

/// Stable external identity of a tracked person
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity assigned to an event by the event store on insert
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// User
// ============================================================================

/// Behavioral profile of one tracked person
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    /// Baseline daily consumption given at onboarding
    pub cigarettes_per_day: u32,
    /// Price of a single cigarette, always > 0
    pub cigarette_cost: f64,
    /// Current mandatory wait, kept within the interval bounds in `rules`
    pub interval_minutes: u32,
    pub last_interval_update: DateTime<Utc>,
    /// Absent or in the past means the user may act now
    pub next_allowed_time: Option<DateTime<Utc>>,
    /// Consecutive early acts
    pub early_counter: u32,
    pub spent: f64,
    pub savings: f64,
    /// Consecutive on-schedule acts, consumed by the growth sweep
    pub days_success_streak: u32,
    #[serde(default)]
    pub growth_pause_until: Option<NaiveDate>,
    #[serde(default)]
    pub target_cigs_per_day: Option<u32>,
    #[serde(default)]
    pub last_delay_offer: Option<DateTime<Utc>>,
}

impl User {
    /// Change the interval and stamp the update time
    pub fn set_interval(&mut self, minutes: u32, now: DateTime<Utc>) {
        self.interval_minutes = minutes;
        self.last_interval_update = now;
    }

    pub fn interval(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }

    /// True while a growth pause is in force on `today`
    pub fn growth_paused_on(&self, today: NaiveDate) -> bool {
        matches!(self.growth_pause_until, Some(until) if today < until)
    }
}

// ============================================================================
// Smoking Event
// ============================================================================

/// A single consumption act, immutable once created
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SmokingEvent {
    /// Assigned by the event store; `None` until appended
    #[serde(default)]
    pub id: Option<EventId>,
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
    /// What `next_allowed_time` was when the event occurred
    pub planned_time: DateTime<Utc>,
    pub was_early: bool,
    /// Interval in force when the event occurred
    pub interval_before: u32,
}

// ============================================================================
// Availability
// ============================================================================

/// Answer to "may the user act now?"
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Availability {
    pub can_act: bool,
    /// Whole seconds until the user may act, rounded up; zero when `can_act`
    pub seconds_left: u64,
}

impl Availability {
    pub fn now() -> Self {
        Self {
            can_act: true,
            seconds_left: 0,
        }
    }
}
