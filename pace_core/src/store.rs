//! Storage contracts for users and events, plus in-memory backends.
//!
//! Writes take `&mut self`: whoever holds a store mutably owns the
//! read-modify-write of every record in it, so use cases run as one unit.

use crate::{Error, EventId, Result, SmokingEvent, User, UserId};
use std::collections::BTreeMap;

/// User record store
pub trait UserStore {
    fn find(&self, id: UserId) -> Result<Option<User>>;
    fn create(&mut self, user: &User) -> Result<()>;
    /// Fails with `Error::UnknownUser` if the identity has no record
    fn save(&mut self, user: &User) -> Result<()>;
    fn list_all(&self) -> Result<Vec<User>>;
    fn delete(&mut self, id: UserId) -> Result<()>;
}

/// Smoking event log
pub trait EventStore {
    /// Store the event and return it with its assigned id
    fn append(&mut self, event: SmokingEvent) -> Result<SmokingEvent>;
    /// Events for a user, newest first
    fn list_for_user(&self, user: UserId, limit: Option<usize>) -> Result<Vec<SmokingEvent>>;
    /// Fails with `Error::UnknownEvent` if no event has this id
    fn delete(&mut self, id: EventId) -> Result<()>;
    /// Remove every event of a user, returning how many were removed
    fn delete_for_user(&mut self, user: UserId) -> Result<usize>;

    fn most_recent_for_user(&self, user: UserId) -> Result<Option<SmokingEvent>> {
        Ok(self.list_for_user(user, Some(1))?.into_iter().next())
    }
}

/// Sort newest first, then truncate; ties keep the later id first
pub(crate) fn newest_first(mut events: Vec<SmokingEvent>, limit: Option<usize>) -> Vec<SmokingEvent> {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    if let Some(limit) = limit {
        events.truncate(limit);
    }
    events
}

// ============================================================================
// In-memory backends
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: BTreeMap<UserId, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryUserStore {
    fn find(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&id).cloned())
    }

    fn create(&mut self, user: &User) -> Result<()> {
        if self.users.contains_key(&user.id) {
            return Err(Error::AlreadyExists(user.id));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    fn save(&mut self, user: &User) -> Result<()> {
        match self.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(Error::UnknownUser(user.id)),
        }
    }

    fn list_all(&self) -> Result<Vec<User>> {
        Ok(self.users.values().cloned().collect())
    }

    fn delete(&mut self, id: UserId) -> Result<()> {
        self.users.remove(&id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: Vec<SmokingEvent>,
    next_id: u64,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventStore for MemoryEventStore {
    fn append(&mut self, mut event: SmokingEvent) -> Result<SmokingEvent> {
        self.next_id += 1;
        event.id = Some(EventId(self.next_id));
        self.events.push(event.clone());
        Ok(event)
    }

    fn list_for_user(&self, user: UserId, limit: Option<usize>) -> Result<Vec<SmokingEvent>> {
        let events = self
            .events
            .iter()
            .filter(|e| e.user_id == user)
            .cloned()
            .collect();
        Ok(newest_first(events, limit))
    }

    fn delete(&mut self, id: EventId) -> Result<()> {
        let before = self.events.len();
        self.events.retain(|e| e.id != Some(id));
        if self.events.len() == before {
            return Err(Error::UnknownEvent(id));
        }
        Ok(())
    }

    fn delete_for_user(&mut self, user: UserId) -> Result<usize> {
        let before = self.events.len();
        self.events.retain(|e| e.user_id != user);
        Ok(before - self.events.len())
    }
}
