//! Request registry
//!
//! In-memory, newest-first, capacity-bounded list of request records.
//! Every mutation notifies subscribers synchronously with the full
//! snapshot and then persists a trimmed copy of the completed records.
//! Listeners must not assume persistence has finished; it is best-effort.

use crate::models::{
    CartDiff, CartSnapshot, RecordFilter, RequestRecord, RequestStatus,
};
use crate::storage::record_store::RecordStore;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_PERSIST_LIMIT: usize = 32;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(pub(crate) u64);

type RecordListener = Box<dyn Fn(&[RequestRecord]) + Send + Sync>;

/// Fields applied to a record when its call settles.
#[derive(Debug, Default)]
pub struct Settlement {
    pub status_code: Option<u16>,
    pub response_headers: Option<HashMap<String, String>>,
    pub response_body: Option<String>,
    pub error: Option<String>,
    pub cart_before: Option<CartSnapshot>,
    pub cart_after: Option<CartSnapshot>,
    pub cart_diff: Option<CartDiff>,
}

pub struct RequestRegistry {
    /// Newest-first; evicted from the back
    records: Mutex<VecDeque<RequestRecord>>,
    capacity: usize,
    persist_limit: usize,
    store: Option<Arc<RecordStore>>,
    listeners: Mutex<HashMap<u64, RecordListener>>,
    next_listener_id: AtomicU64,
}

impl RequestRegistry {
    pub fn new(capacity: usize, persist_limit: usize, store: Option<Arc<RecordStore>>) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            persist_limit,
            store,
            listeners: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(0),
        }
    }

    /// Reload persisted records. Whatever status they were saved with,
    /// they reflect a previous page life and are forced to Stale.
    pub fn load_persisted(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let loaded = match store.load() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("failed to load persisted records: {:#}", e);
                return;
            }
        };
        if loaded.is_empty() {
            return;
        }
        {
            let mut records = self.records.lock().unwrap();
            for mut record in loaded {
                record.status = RequestStatus::Stale;
                records.push_back(record);
            }
            while records.len() > self.capacity {
                records.pop_back();
            }
        }
        self.notify_and_persist();
    }

    /// Insert a freshly-created pending record at the front. Oldest
    /// records are evicted once the capacity is exceeded.
    pub fn insert(&self, record: RequestRecord) {
        {
            let mut records = self.records.lock().unwrap();
            records.push_front(record);
            while records.len() > self.capacity {
                records.pop_back();
            }
        }
        self.notify_and_persist();
    }

    /// Settle a pending record. The transition is applied exactly once;
    /// a record that already settled (or was evicted) is left untouched.
    pub fn complete(&self, id: &str, outcome: RequestStatus, settlement: Settlement) -> bool {
        let applied = {
            let mut records = self.records.lock().unwrap();
            match records.iter_mut().find(|r| r.id == id) {
                Some(record) if record.status.can_transition_to(outcome) => {
                    let now = Utc::now();
                    record.status = outcome;
                    record.completed_at = Some(now);
                    record.duration_ms = Some(
                        (now - record.started_at).num_milliseconds().max(0) as u64,
                    );
                    record.status_code = settlement.status_code;
                    record.response_headers = settlement.response_headers;
                    record.response_body = settlement.response_body;
                    record.error = settlement.error;
                    record.cart_before = settlement.cart_before;
                    record.cart_after = settlement.cart_after;
                    record.cart_diff = settlement.cart_diff;
                    true
                }
                _ => false,
            }
        };
        if applied {
            self.notify_and_persist();
        }
        applied
    }

    /// Demote aged successes to stale. Error records are never touched;
    /// the sweep is idempotent. Returns how many records transitioned.
    pub fn mark_stale_older_than(&self, threshold: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(threshold).unwrap_or_else(|_| chrono::Duration::zero());
        let transitioned = {
            let mut records = self.records.lock().unwrap();
            let mut count = 0;
            for record in records.iter_mut() {
                if record.status == RequestStatus::Success {
                    if let Some(completed_at) = record.completed_at {
                        if completed_at < cutoff {
                            record.status = RequestStatus::Stale;
                            count += 1;
                        }
                    }
                }
            }
            count
        };
        if transitioned > 0 {
            tracing::debug!(transitioned, "stale sweep demoted records");
            self.notify_and_persist();
        }
        transitioned
    }

    /// Current snapshot, newest first.
    pub fn snapshot(&self) -> Vec<RequestRecord> {
        self.records.lock().unwrap().iter().cloned().collect()
    }

    pub fn filtered(&self, filter: &RecordFilter) -> Vec<RequestRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn get_by_id(&self, id: &str) -> Option<RequestRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Empty both memory and durable storage.
    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                tracing::warn!("failed to clear persisted records: {:#}", e);
            }
        }
        self.notify();
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[RequestRecord]) + Send + Sync + 'static,
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
        let snapshot = self.snapshot();
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.values() {
            listener(&snapshot);
        }
    }

    fn notify_and_persist(&self) {
        self.notify();
        if let Some(store) = &self.store {
            let trimmed: Vec<RequestRecord> = self
                .snapshot()
                .into_iter()
                .filter(RequestRecord::is_complete)
                .take(self.persist_limit)
                .map(|r| r.trimmed_for_storage())
                .collect();
            if let Err(e) = store.save(&trimmed) {
                tracing::warn!("failed to persist records: {:#}", e);
            }
        }
    }
}
