//! Nightly interval growth.
//!
//! This module implements the adaptive growth rules:
//! - A growth pause suppresses everything until it expires, then is cleared
//! - A success streak of three grows the interval by 15% (capped) and is consumed
//! - A daily target ratchets down once the interval catches up with it

use crate::rules;
use crate::store::UserStore;
use crate::{Error, Result, User, UserId};
use chrono::{DateTime, Utc};

/// What the sweep did to a single user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowthOutcome {
    /// A growth pause is still in force
    Paused,
    /// Interval grown; `target_lowered` when the daily target dropped by one
    Grown { from: u32, to: u32, target_lowered: bool },
    /// No rule fired (an expired pause may have been cleared)
    Unchanged,
}

/// Result of one sweep over all users
#[derive(Debug, Default)]
pub struct SweepReport {
    pub processed: usize,
    pub grown: Vec<UserId>,
    pub paused: Vec<UserId>,
    /// Users whose record could not be saved; the rest of the sweep still ran
    pub failures: Vec<(UserId, Error)>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply the growth rules to one user in memory.
pub fn grow_user(user: &mut User, now: DateTime<Utc>) -> GrowthOutcome {
    let today = now.date_naive();

    if user.growth_paused_on(today) {
        return GrowthOutcome::Paused;
    }
    if user.growth_pause_until.take().is_some() {
        tracing::debug!("User {}: growth pause expired", user.id);
    }

    if user.days_success_streak < rules::GROWTH_STREAK_THRESHOLD {
        return GrowthOutcome::Unchanged;
    }

    let from = user.interval_minutes;
    let to = rules::grown_interval(from);
    user.set_interval(to, now);
    user.days_success_streak = 0;

    let mut target_lowered = false;
    if let Some(target) = user.target_cigs_per_day {
        if let Some(threshold) = rules::target_threshold(target) {
            if to >= threshold {
                user.target_cigs_per_day = Some(target - 1);
                target_lowered = true;
            }
        }
    }

    tracing::info!(
        "User {}: interval grown {} -> {} min{}",
        user.id,
        from,
        to,
        if target_lowered { ", daily target lowered" } else { "" }
    );

    GrowthOutcome::Grown {
        from,
        to,
        target_lowered,
    }
}

/// Run the growth rules over every user and write each record back.
///
/// Every user is saved even when nothing changed. A failed save is recorded
/// in the report and the sweep moves on; only a failure to list users aborts.
pub fn run_growth_sweep<U: UserStore>(users: &mut U, now: DateTime<Utc>) -> Result<SweepReport> {
    let all = users.list_all()?;
    let mut report = SweepReport::default();

    for mut user in all {
        let outcome = grow_user(&mut user, now);
        report.processed += 1;

        if let Err(e) = users.save(&user) {
            tracing::warn!("Growth sweep: failed to save user {}: {}", user.id, e);
            report.failures.push((user.id, e));
            continue;
        }

        match outcome {
            GrowthOutcome::Grown { .. } => report.grown.push(user.id),
            GrowthOutcome::Paused => report.paused.push(user.id),
            GrowthOutcome::Unchanged => {}
        }
    }

    tracing::info!(
        "Growth sweep: {} users, {} grown, {} paused, {} failed",
        report.processed,
        report.grown.len(),
        report.paused.len(),
        report.failures.len()
    );
    Ok(report)
}
