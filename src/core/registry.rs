use std::collections::HashMap;
use tokio::time::Instant;

use crate::domain::SessionId;
use crate::media::{MediaState, Session, SessionCallbacks, SessionSnapshot};

/// A session together with the callbacks of the caller that created it.
#[derive(Debug)]
pub struct SessionEntry {
    pub session: Session,
    pub callbacks: SessionCallbacks,
}

/// Sessions keyed by id, listed in insertion order.
///
/// Owned by the controller task; there is no process-wide table.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: HashMap<SessionId, SessionEntry>,
    order: Vec<SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session under its own id; re-inserting keeps its position.
    pub fn insert(&mut self, session: Session, callbacks: SessionCallbacks) -> SessionId {
        let id = session.id();
        if self
            .entries
            .insert(id, SessionEntry { session, callbacks })
            .is_none()
        {
            self.order.push(id);
        }
        id
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &SessionId) -> Option<&SessionEntry> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut SessionEntry> {
        self.entries.get_mut(id)
    }

    /// Removes the entry; later lookups for `id` miss.
    pub fn remove(&mut self, id: &SessionId) -> Option<SessionEntry> {
        let entry = self.entries.remove(id)?;
        self.order.retain(|x| x != id);
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SessionEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// First session, in insertion order, carrying `media_id`.
    pub fn find_by_media_id(&self, media_id: &str) -> Option<&SessionEntry> {
        self.iter()
            .find(|e| e.session.tags().media_id == media_id)
    }

    /// Snapshots of all sessions in insertion order.
    pub fn list(&self) -> Vec<SessionSnapshot> {
        self.iter().map(|e| e.session.snapshot()).collect()
    }

    /// Snapshots of sessions in `Running`. Sessions fading out are excluded.
    pub fn running(&self) -> Vec<SessionSnapshot> {
        self.iter()
            .filter(|e| e.session.state() == MediaState::Running)
            .map(|e| e.session.snapshot())
            .collect()
    }

    /// Earliest scheduled tracker tick across all sessions.
    pub fn earliest_tick(&self) -> Option<Instant> {
        self.entries
            .values()
            .filter_map(|e| e.session.tracker().next_tick())
            .min()
    }

    /// Sessions whose tracker tick is due at `now`, in insertion order.
    pub fn due(&self, now: Instant) -> Vec<SessionId> {
        self.order
            .iter()
            .filter(|id| {
                self.entries
                    .get(id)
                    .is_some_and(|e| e.session.tracker().is_due(now))
            })
            .copied()
            .collect()
    }
}
