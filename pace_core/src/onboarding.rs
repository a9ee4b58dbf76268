//! User onboarding and reset.

use crate::rules;
use crate::store::{EventStore, UserStore};
use crate::{Error, Result, User, UserId};
use chrono::{DateTime, Utc};

/// Values derived from the onboarding answers
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OnboardingPlan {
    pub interval_minutes: u32,
    pub cigarette_cost: f64,
}

/// Derive the starting interval and per-cigarette price.
///
/// A zero daily baseline is treated as one. Price and pack size must be positive.
pub fn plan_onboarding(
    cigarettes_per_day: u32,
    price_per_pack: f64,
    cigarettes_per_pack: u32,
) -> Result<OnboardingPlan> {
    if !(price_per_pack.is_finite() && price_per_pack > 0.0) {
        return Err(Error::InvalidInput(format!(
            "price per pack must be positive, got {}",
            price_per_pack
        )));
    }
    if cigarettes_per_pack == 0 {
        return Err(Error::InvalidInput(
            "cigarettes per pack must be positive".into(),
        ));
    }

    Ok(OnboardingPlan {
        interval_minutes: rules::initial_interval(cigarettes_per_day),
        cigarette_cost: rules::cigarette_cost(price_per_pack, cigarettes_per_pack),
    })
}

/// Create the user's profile, or return the existing one untouched.
pub fn initialize_user<U: UserStore>(
    users: &mut U,
    id: UserId,
    cigarettes_per_day: u32,
    price_per_pack: f64,
    cigarettes_per_pack: u32,
    now: DateTime<Utc>,
) -> Result<User> {
    if let Some(existing) = users.find(id)? {
        tracing::debug!("User {} already initialized", id);
        return Ok(existing);
    }

    let plan = plan_onboarding(cigarettes_per_day, price_per_pack, cigarettes_per_pack)?;

    let user = User {
        id,
        cigarettes_per_day: cigarettes_per_day.max(1),
        cigarette_cost: plan.cigarette_cost,
        interval_minutes: plan.interval_minutes,
        last_interval_update: now,
        next_allowed_time: None,
        early_counter: 0,
        spent: 0.0,
        savings: 0.0,
        days_success_streak: 0,
        growth_pause_until: None,
        target_cigs_per_day: None,
        last_delay_offer: None,
    };

    users.create(&user)?;
    tracing::info!(
        "Initialized user {}: interval {} min, {:.2} per cigarette",
        id,
        user.interval_minutes,
        user.cigarette_cost
    );
    Ok(user)
}

/// Forget a user entirely: events first, then the profile.
///
/// Returns the number of events removed.
pub fn reset_user<U: UserStore, E: EventStore>(
    users: &mut U,
    events: &mut E,
    id: UserId,
) -> Result<usize> {
    let removed = events.delete_for_user(id)?;
    users.delete(id)?;
    tracing::info!("Reset user {} ({} events removed)", id, removed);
    Ok(removed)
}
