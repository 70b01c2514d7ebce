//! Session playback flag
//!
//! A boolean "already played" marker kept in session storage. The intro uses
//! it so a visitor sees the reveal once per browsing session.
//!
//! Storage is allowed to fail (private browsing, quota, disabled storage).
//! Failures never reach the caller: a failed read reports "not played", a
//! failed write is dropped. The worst outcome is one extra replay.

use overture_platform::SessionStorage;
use std::rc::Rc;

/// Value written for a played flag; anything else reads as unset
pub const PLAYED_MARKER: &str = "true";

/// Failure-tolerant accessor for the session playback flag
#[derive(Clone)]
pub struct SessionPlaybackStore {
    storage: Rc<dyn SessionStorage>,
}

impl SessionPlaybackStore {
    pub fn new(storage: Rc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Whether the flag under `key` is set
    pub fn get(&self, key: &str) -> bool {
        match self.storage.get_item(key) {
            Ok(value) => value.as_deref() == Some(PLAYED_MARKER),
            Err(err) => {
                tracing::debug!("Session flag '{key}' unreadable, treating as unset: {err}");
                false
            }
        }
    }

    /// Mark the flag under `key` as set
    ///
    /// Idempotent. A failed write is logged and otherwise ignored.
    pub fn set(&self, key: &str) {
        if let Err(err) = self.storage.set_item(key, PLAYED_MARKER) {
            tracing::debug!("Session flag '{key}' not persisted: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overture_platform::headless::MemoryStorage;

    const KEY: &str = "heroNameTyped";

    #[test]
    fn test_unset_then_set() {
        let store = SessionPlaybackStore::new(Rc::new(MemoryStorage::new()));
        assert!(!store.get(KEY));

        store.set(KEY);
        assert!(store.get(KEY));

        store.set(KEY);
        assert!(store.get(KEY));
    }

    #[test]
    fn test_foreign_value_reads_as_unset() {
        let storage = Rc::new(MemoryStorage::new());
        storage.set_item(KEY, "yes").unwrap();

        let store = SessionPlaybackStore::new(storage);
        assert!(!store.get(KEY));
    }

    #[test]
    fn test_failures_are_swallowed() {
        let storage = Rc::new(MemoryStorage::failing());
        let store = SessionPlaybackStore::new(storage.clone());

        store.set(KEY);
        assert!(!store.get(KEY));
        assert_eq!(storage.peek(KEY), None);
    }

    #[test]
    fn test_failed_read_hides_a_stored_flag() {
        let storage = Rc::new(MemoryStorage::new());
        let store = SessionPlaybackStore::new(storage.clone());
        store.set(KEY);

        storage.set_failing(true);
        assert!(!store.get(KEY));
    }

    #[test]
    fn test_flag_cleared_with_session() {
        let storage = Rc::new(MemoryStorage::new());
        let store = SessionPlaybackStore::new(storage.clone());
        store.set(KEY);

        storage.clear();
        assert!(!store.get(KEY));
    }
}
