//! Inspector service
//!
//! The per-session service object consuming panels are handed. One
//! instance owns the shim, registry, blocklist, and staleness monitor;
//! there is no module-level singleton. Construct it once, inject it
//! everywhere.

use crate::intercept::{
    BlockedSource, SourceBlocklist, StalenessMonitor, TransportShim, DEFAULT_CART_ENDPOINT,
    DEFAULT_STALE_AFTER, DEFAULT_SWEEP_INTERVAL,
};
use crate::models::{RecordFilter, RequestRecord};
use crate::replay::{self, ReplayEdit};
use crate::storage::{
    RecordStore, RequestRegistry, SubscriptionId, DEFAULT_CAPACITY, DEFAULT_PERSIST_LIMIT,
};
use crate::transport::{
    ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse,
};
use anyhow::anyhow;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Inspector configuration
#[derive(Debug, Clone)]
pub struct InspectorConfig {
    /// In-memory record cap; oldest records evicted beyond this
    pub capacity: usize,
    /// How many completed records are persisted across reloads
    pub persist_limit: usize,
    /// Age at which a successful record is demoted to stale
    pub stale_after: Duration,
    /// How often the staleness sweep runs
    pub sweep_interval: Duration,
    /// Durable storage directory; None disables persistence
    pub storage_path: Option<PathBuf>,
    /// Canonical cart-read path used for snapshot fetches
    pub cart_endpoint: String,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            persist_limit: DEFAULT_PERSIST_LIMIT,
            stale_after: DEFAULT_STALE_AFTER,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            storage_path: None,
            cart_endpoint: DEFAULT_CART_ENDPOINT.to_string(),
        }
    }
}

/// Runtime-traffic recording engine for the storefront devtools.
pub struct Inspector {
    shim: Arc<TransportShim>,
    registry: Arc<RequestRegistry>,
    blocklist: Arc<SourceBlocklist>,
    monitor: Mutex<Option<StalenessMonitor>>,
    config: InspectorConfig,
}

impl Inspector {
    /// Build an inspector over an injected transport client. Persisted
    /// records from a previous session are reloaded (and demoted to
    /// stale) here.
    pub fn new(config: InspectorConfig, transport: Arc<dyn Transport>) -> anyhow::Result<Self> {
        let store = match &config.storage_path {
            Some(path) => Some(Arc::new(RecordStore::new(path)?)),
            None => None,
        };
        let registry = Arc::new(RequestRegistry::new(
            config.capacity,
            config.persist_limit,
            store,
        ));
        registry.load_persisted();

        let shim = Arc::new(TransportShim::new(
            transport,
            Arc::clone(&registry),
            config.cart_endpoint.clone(),
        ));

        Ok(Self {
            shim,
            registry,
            blocklist: Arc::new(SourceBlocklist::new()),
            monitor: Mutex::new(None),
            config,
        })
    }

    /// Build an inspector over the production reqwest transport.
    pub fn with_default_transport(config: InspectorConfig) -> anyhow::Result<Self> {
        Self::new(config, Arc::new(ReqwestTransport::new()))
    }

    /// Enable tracking and start the staleness monitor. Idempotent:
    /// calling install on an installed inspector is a no-op.
    pub fn install(&self) {
        let mut monitor = self.monitor.lock().unwrap();
        if monitor.is_some() {
            return;
        }
        self.shim.set_enabled(true);
        *monitor = Some(StalenessMonitor::start(
            Arc::clone(&self.registry),
            self.config.sweep_interval,
            self.config.stale_after,
        ));
        tracing::info!("inspector installed");
    }

    /// Disable tracking and stop the monitor. Idempotent.
    pub fn uninstall(&self) {
        let mut monitor = self.monitor.lock().unwrap();
        if let Some(monitor) = monitor.take() {
            monitor.stop();
        }
        self.shim.set_enabled(false);
        tracing::info!("inspector uninstalled");
    }

    pub fn is_installed(&self) -> bool {
        self.monitor.lock().unwrap().is_some()
    }

    /// Promise-style tracked call surface.
    pub async fn fetch(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.shim.send(request).await
    }

    /// Callback-style tracked call surface.
    pub fn fetch_with_callback<F>(&self, request: TransportRequest, callback: F)
    where
        F: FnOnce(Result<TransportResponse, TransportError>) + Send + 'static,
    {
        self.shim.send_with_callback(request, callback);
    }

    /// Subscribe to record-list changes; the callback receives the full
    /// newest-first list on every insert/update/clear.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[RequestRecord]) + Send + Sync + 'static,
    {
        self.registry.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.registry.unsubscribe(id);
    }

    /// Current snapshot, newest first.
    pub fn get_requests(&self) -> Vec<RequestRecord> {
        self.registry.snapshot()
    }

    pub fn get_requests_filtered(&self, filter: &RecordFilter) -> Vec<RequestRecord> {
        self.registry.filtered(filter)
    }

    pub fn request_count(&self) -> usize {
        self.registry.count()
    }

    /// Empty both the in-memory list and durable storage.
    pub fn clear(&self) {
        self.registry.clear();
        tracing::info!("request history cleared");
    }

    // Source blocklist surface. Blocking hides records from consumers by
    // default; the underlying requests are always issued.

    pub fn block_source(&self, source_id: &str, stack: &str, label: &str) {
        self.blocklist.register(source_id, stack, label);
    }

    pub fn unblock_source(&self, source_id: &str) -> bool {
        self.blocklist.unregister(source_id)
    }

    pub fn clear_blocked_sources(&self) {
        self.blocklist.clear_all();
    }

    pub fn is_blocked(&self, source_id: &str) -> bool {
        self.blocklist.is_blocked(source_id)
    }

    pub fn blocked_sources(&self) -> Vec<BlockedSource> {
        self.blocklist.list()
    }

    pub fn subscribe_to_blocked_sources<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[BlockedSource]) + Send + Sync + 'static,
    {
        self.blocklist.subscribe(callback)
    }

    pub fn unsubscribe_from_blocked_sources(&self, id: SubscriptionId) {
        self.blocklist.unsubscribe(id);
    }

    /// Replay a captured record (with optional edits) through the shim.
    /// The replay produces a brand-new record, unlinked from the original.
    pub async fn replay(
        &self,
        record_id: &str,
        edit: ReplayEdit,
    ) -> anyhow::Result<TransportResponse> {
        let record = self
            .registry
            .get_by_id(record_id)
            .ok_or_else(|| anyhow!("record not found: {}", record_id))?;
        Ok(replay::replay_request(&self.shim, &record, edit).await?)
    }
}
