//! Source blocklist
//!
//! Registry of call-site fingerprints the user has chosen to hide.
//! Blocking is a display filter: the shim still issues and tracks every
//! request, consumers just hide flagged records by default. Entries live
//! for the session only and are never persisted.

use crate::storage::SubscriptionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

/// A user-suppressed call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedSource {
    /// Call-site fingerprint
    pub id: String,
    /// User-facing label
    pub label: String,
    /// Stack text captured when the source was blocked
    pub source: String,
}

type BlocklistListener = Box<dyn Fn(&[BlockedSource]) + Send + Sync>;

#[derive(Default)]
pub struct SourceBlocklist {
    entries: RwLock<Vec<BlockedSource>>,
    listeners: Mutex<HashMap<u64, BlocklistListener>>,
    next_listener_id: AtomicU64,
}

impl SourceBlocklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block a call site. Re-registering an id replaces its entry.
    pub fn register(&self, source_id: &str, stack: &str, label: &str) {
        {
            let mut entries = self.entries.write().unwrap();
            entries.retain(|entry| entry.id != source_id);
            entries.push(BlockedSource {
                id: source_id.to_string(),
                label: label.to_string(),
                source: stack.to_string(),
            });
        }
        tracing::debug!(source_id, "source blocked");
        self.notify();
    }

    /// Unblock a call site. Returns whether an entry was removed.
    pub fn unregister(&self, source_id: &str) -> bool {
        let removed = {
            let mut entries = self.entries.write().unwrap();
            let before = entries.len();
            entries.retain(|entry| entry.id != source_id);
            before != entries.len()
        };
        if removed {
            self.notify();
        }
        removed
    }

    pub fn is_blocked(&self, source_id: &str) -> bool {
        self.entries
            .read()
            .unwrap()
            .iter()
            .any(|entry| entry.id == source_id)
    }

    pub fn clear_all(&self) {
        self.entries.write().unwrap().clear();
        self.notify();
    }

    pub fn list(&self) -> Vec<BlockedSource> {
        self.entries.read().unwrap().clone()
    }

    /// Subscribe to blocklist changes. The callback receives the full
    /// entry list on every change.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[BlockedSource]) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap()
            .insert(id, Box::new(callback));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().unwrap().remove(&id.0);
    }

    fn notify(&self) {
        let snapshot = self.list();
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.values() {
            listener(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn register_then_query_then_unregister() {
        let blocklist = SourceBlocklist::new();
        assert!(!blocklist.is_blocked("src-1"));

        blocklist.register("src-1", "at trackCart (app.js:12)", "cart poller");
        assert!(blocklist.is_blocked("src-1"));
        assert_eq!(blocklist.list().len(), 1);

        assert!(blocklist.unregister("src-1"));
        assert!(!blocklist.is_blocked("src-1"));
        assert!(!blocklist.unregister("src-1"));
    }

    #[test]
    fn reregistering_replaces_entry() {
        let blocklist = SourceBlocklist::new();
        blocklist.register("src-1", "stack a", "first");
        blocklist.register("src-1", "stack b", "second");

        let entries = blocklist.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "second");
    }

    #[test]
    fn clear_all_empties_everything() {
        let blocklist = SourceBlocklist::new();
        blocklist.register("a", "", "");
        blocklist.register("b", "", "");
        blocklist.clear_all();
        assert!(!blocklist.is_blocked("a"));
        assert!(!blocklist.is_blocked("b"));
        assert!(blocklist.list().is_empty());
    }

    #[test]
    fn subscribers_see_every_change_until_unsubscribed() {
        let blocklist = SourceBlocklist::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_cb = Arc::clone(&calls);
        let sub = blocklist.subscribe(move |_| {
            calls_cb.fetch_add(1, Ordering::SeqCst);
        });

        blocklist.register("a", "", "");
        blocklist.unregister("a");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        blocklist.unsubscribe(sub);
        blocklist.register("b", "", "");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
