//! Latest-request-wins bookkeeping for asynchronous engine queries.
//!
//! Each key keeps only the most recent request id; a reply carrying any
//! other id is stale and is dropped.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
pub struct RequestTracker<K> {
    pending: HashMap<K, u64>,
}

impl<K: Eq + Hash> Default for RequestTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> RequestTracker<K> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Records a new request for `key`, superseding any pending one.
    pub fn issue(&mut self, key: K, req_id: u64) -> u64 {
        self.pending.insert(key, req_id);
        req_id
    }

    /// Accepts a reply only if it answers the latest request for `key`;
    /// accepting clears the pending state.
    pub fn accept(&mut self, key: &K, req_id: u64) -> bool {
        match self.pending.get(key) {
            Some(&pending_id) if pending_id == req_id => {
                self.pending.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Forgets `key`; a late reply for it is then stale.
    pub fn clear(&mut self, key: &K) {
        self.pending.remove(key);
    }

    /// Whether a request for `key` is still unanswered.
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionId;

    #[test]
    fn issue_and_accept() {
        let mut tracker: RequestTracker<&str> = RequestTracker::new();
        assert_eq!(tracker.issue("poll", 1), 1);
        assert!(tracker.is_pending(&"poll"));
        assert!(tracker.accept(&"poll", 1));
        assert!(!tracker.is_pending(&"poll"));
    }

    #[test]
    fn only_latest_is_accepted() {
        let mut tracker: RequestTracker<&str> = RequestTracker::new();
        tracker.issue("poll", 1);
        tracker.issue("poll", 2);
        assert!(!tracker.accept(&"poll", 1));
        assert!(tracker.is_pending(&"poll"));
        assert!(tracker.accept(&"poll", 2));
    }

    #[test]
    fn accept_without_issue_is_rejected() {
        let mut tracker: RequestTracker<&str> = RequestTracker::new();
        assert!(!tracker.accept(&"poll", 999));
    }

    #[test]
    fn cleared_key_drops_late_reply() {
        let mut tracker = RequestTracker::new();
        let id = SessionId::new();
        tracker.issue(id, 7);
        tracker.clear(&id);
        assert!(!tracker.accept(&id, 7));
        assert!(!tracker.is_pending(&id));
    }

    #[test]
    fn sessions_are_independent() {
        let mut tracker = RequestTracker::new();
        let (a, b) = (SessionId::new(), SessionId::new());
        tracker.issue(a, 1);
        tracker.issue(b, 2);
        assert!(tracker.accept(&a, 1));
        assert!(!tracker.is_pending(&a));
        assert!(tracker.is_pending(&b));
        assert!(!tracker.accept(&b, 1));
        assert!(tracker.accept(&b, 2));
    }
}
