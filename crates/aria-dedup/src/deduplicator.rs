use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use aria_core::current_unix_timestamp_ms;

use crate::seen_store::SeenStore;

pub const DEFAULT_DEDUP_TTL_MS: u64 = 300_000;
pub const DEFAULT_DEDUP_SWEEP_INTERVAL_MS: u64 = 60_000;

#[derive(Clone)]
/// Public struct `EventDeduplicator` used across Aria components.
pub struct EventDeduplicator {
    store: Arc<dyn SeenStore>,
    ttl_ms: u64,
}

impl EventDeduplicator {
    pub fn new(store: Arc<dyn SeenStore>) -> Self {
        Self {
            store,
            ttl_ms: DEFAULT_DEDUP_TTL_MS,
        }
    }

    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Reports whether `event_id` was already seen within the retention
    /// window, recording it as seen otherwise. The id is an opaque key and
    /// is looked up exactly as received. Fails open on store errors: a
    /// degraded seen store must never block message processing.
    pub fn is_duplicate(&self, event_id: &str) -> bool {
        if event_id.trim().is_empty() {
            eprintln!("event dedup skipped: reason_code=empty_event_id");
            return false;
        }
        match self
            .store
            .check_and_record(event_id, current_unix_timestamp_ms())
        {
            Ok(seen) => seen,
            Err(error) => {
                eprintln!(
                    "event dedup store degraded, failing open: reason_code=seen_store_error detail={}",
                    error
                );
                false
            }
        }
    }

    /// Removes entries older than the retention window. Returns how many
    /// entries were removed; store errors are logged and reported as zero.
    pub fn sweep_expired(&self) -> usize {
        match self
            .store
            .sweep_expired(current_unix_timestamp_ms(), self.ttl_ms)
        {
            Ok(removed) => removed,
            Err(error) => {
                eprintln!(
                    "event dedup sweep failed: reason_code=seen_store_error detail={}",
                    error
                );
                0
            }
        }
    }

    /// Runs the retention sweep on a fixed cadence, independent of lookup
    /// traffic. The task runs for the lifetime of the process.
    pub fn spawn_sweep_task(&self, sweep_interval_ms: u64) -> JoinHandle<()> {
        let deduplicator = self.clone();
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_millis(sweep_interval_ms.max(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so a fresh process
            // does not sweep an empty store.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = deduplicator.sweep_expired();
                if removed > 0 {
                    println!("event dedup sweep: removed={}", removed);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seen_store::InMemorySeenStore;

    fn deduplicator_with_ttl(ttl_ms: u64) -> EventDeduplicator {
        EventDeduplicator::new(Arc::new(InMemorySeenStore::new())).with_ttl_ms(ttl_ms)
    }

    #[test]
    fn functional_first_call_unseen_then_duplicate_within_ttl() {
        let deduplicator = deduplicator_with_ttl(DEFAULT_DEDUP_TTL_MS);
        assert!(!deduplicator.is_duplicate("evt-1"));
        assert!(deduplicator.is_duplicate("evt-1"));
        assert!(deduplicator.is_duplicate("evt-1"));
        assert!(!deduplicator.is_duplicate("evt-2"));
    }

    #[test]
    fn functional_event_reprocessable_after_ttl_and_sweep() {
        let deduplicator = deduplicator_with_ttl(1);
        assert!(!deduplicator.is_duplicate("evt-1"));
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(deduplicator.sweep_expired(), 1);
        assert!(!deduplicator.is_duplicate("evt-1"));
    }

    #[test]
    fn unit_empty_event_id_is_never_a_duplicate() {
        let deduplicator = deduplicator_with_ttl(DEFAULT_DEDUP_TTL_MS);
        assert!(!deduplicator.is_duplicate(""));
        assert!(!deduplicator.is_duplicate("   "));
        assert!(!deduplicator.is_duplicate(""));
    }

    #[test]
    fn regression_event_id_is_opaque_and_never_normalized() {
        let deduplicator = deduplicator_with_ttl(DEFAULT_DEDUP_TTL_MS);
        assert!(!deduplicator.is_duplicate(" evt-1 "));
        // A differently-padded id is a different event, not a repeat.
        assert!(!deduplicator.is_duplicate("evt-1"));
        assert!(deduplicator.is_duplicate(" evt-1 "));
        assert!(deduplicator.is_duplicate("evt-1"));
    }

    #[tokio::test]
    async fn integration_sweep_task_clears_expired_entries() {
        let store = Arc::new(InMemorySeenStore::new());
        let deduplicator = EventDeduplicator::new(store.clone()).with_ttl_ms(1);
        assert!(!deduplicator.is_duplicate("evt-1"));
        let handle = deduplicator.spawn_sweep_task(10);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(store.retained_count().expect("count"), 0);
        handle.abort();
    }
}
