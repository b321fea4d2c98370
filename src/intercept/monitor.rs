//! Staleness monitor
//!
//! Periodic sweep demoting aged successful records to stale. Purely a
//! display heuristic: it never re-issues requests and imposes no deadline
//! on in-flight traffic.

use crate::storage::RequestRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);

pub struct StalenessMonitor {
    handle: JoinHandle<()>,
}

impl StalenessMonitor {
    pub fn start(
        registry: Arc<RequestRegistry>,
        sweep_interval: Duration,
        stale_after: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so a fresh
            // install doesn't sweep before anything could age.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.mark_stale_older_than(stale_after);
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for StalenessMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HttpMethod, RequestCategory, RequestRecord, RequestStatus};
    use crate::storage::{RequestRegistry, Settlement};
    use std::collections::HashMap;

    fn completed_record(registry: &RequestRegistry) -> String {
        let record = RequestRecord::pending(
            HttpMethod::Get,
            "https://shop.example/cart.js",
            "/cart.js",
            "cart.js",
            RequestCategory::CartRead,
            HashMap::new(),
            None,
            None,
        );
        let id = record.id.clone();
        registry.insert(record);
        registry.complete(
            &id,
            RequestStatus::Success,
            Settlement {
                status_code: Some(200),
                ..Default::default()
            },
        );
        id
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_demotes_aged_successes() {
        let registry = Arc::new(RequestRegistry::new(10, 32, None));
        completed_record(&registry);

        // Zero threshold: anything completed qualifies on the next tick.
        let monitor = StalenessMonitor::start(
            Arc::clone(&registry),
            Duration::from_millis(10),
            Duration::ZERO,
        );

        // Let the spawned sweep task register its interval before the
        // clock moves, so the advance actually crosses a tick.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(25)).await;
        // Let the spawned sweep task run.
        tokio::task::yield_now().await;

        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].status, RequestStatus::Stale);
        monitor.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_monitor_sweeps_no_more() {
        let registry = Arc::new(RequestRegistry::new(10, 32, None));
        let monitor = StalenessMonitor::start(
            Arc::clone(&registry),
            Duration::from_millis(10),
            Duration::ZERO,
        );
        monitor.stop();

        completed_record(&registry);
        tokio::time::advance(Duration::from_millis(50)).await;
        tokio::task::yield_now().await;

        assert_eq!(registry.snapshot()[0].status, RequestStatus::Success);
    }
}
