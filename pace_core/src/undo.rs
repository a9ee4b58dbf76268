//! Time-bounded undo of the most recent event.

use crate::error::UndoRefusal;
use crate::rules;
use crate::store::{EventStore, UserStore};
use crate::{Error, Result, SmokingEvent, UserId};
use chrono::{DateTime, Utc};

/// Reverse the user's newest event if it is still inside the undo window.
///
/// Restores `next_allowed_time` to the event's planned time and refunds the
/// cigarette cost (never below zero). Early counter, success streak and any
/// interval shrink caused by the event are left as they are.
///
/// All preconditions are checked before anything is written, so a refusal
/// leaves no trace. If the user is saved but the event cannot be deleted the
/// result is `Error::UndoIncomplete`.
pub fn undo_last<U: UserStore, E: EventStore>(
    users: &mut U,
    events: &mut E,
    id: UserId,
    now: DateTime<Utc>,
) -> Result<SmokingEvent> {
    let mut user = users
        .find(id)?
        .ok_or(Error::CannotUndo(UndoRefusal::UserMissing))?;

    let last = events
        .most_recent_for_user(id)?
        .ok_or(Error::CannotUndo(UndoRefusal::NoEvent))?;

    if !rules::within_undo_window(last.timestamp, now) {
        return Err(Error::CannotUndo(UndoRefusal::WindowExpired {
            elapsed_seconds: (now - last.timestamp).num_seconds(),
        }));
    }

    let event_id = last
        .id
        .ok_or(Error::CannotUndo(UndoRefusal::MissingEventId))?;

    user.spent = (user.spent - user.cigarette_cost).max(0.0);
    user.next_allowed_time = Some(last.planned_time);
    users.save(&user)?;

    if let Err(e) = events.delete(event_id) {
        tracing::warn!(
            "User {} restored but event {} could not be deleted: {}",
            id,
            event_id,
            e
        );
        return Err(Error::UndoIncomplete {
            event_id,
            source: Box::new(e),
        });
    }

    tracing::info!("Undid event {} for user {}", event_id, id);
    Ok(last)
}
