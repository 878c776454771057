use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

/// Retention bookkeeping for observed event ids.
///
/// `check_and_record` must be atomic: two concurrent calls with the same id
/// must not both report it as unseen. The in-memory implementation covers
/// single-instance deployments; a shared TTL key-value store can back this
/// trait for multi-instance deployments.
pub trait SeenStore: Send + Sync {
    /// Returns true when `event_id` was already recorded; records it as seen
    /// at `now_unix_ms` otherwise.
    fn check_and_record(&self, event_id: &str, now_unix_ms: u64) -> Result<bool>;

    /// Removes entries first seen more than `ttl_ms` ago. Returns how many
    /// entries were removed.
    fn sweep_expired(&self, now_unix_ms: u64, ttl_ms: u64) -> Result<usize>;

    /// Number of retained entries, for diagnostics.
    fn retained_count(&self) -> Result<usize>;
}

#[derive(Debug, Default)]
/// Public struct `InMemorySeenStore` used across Aria components.
pub struct InMemorySeenStore {
    first_seen_unix_ms: Mutex<HashMap<String, u64>>,
}

impl InMemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeenStore for InMemorySeenStore {
    fn check_and_record(&self, event_id: &str, now_unix_ms: u64) -> Result<bool> {
        let mut entries = self
            .first_seen_unix_ms
            .lock()
            .map_err(|_| anyhow!("seen store lock is poisoned"))?;
        if entries.contains_key(event_id) {
            return Ok(true);
        }
        entries.insert(event_id.to_string(), now_unix_ms);
        Ok(false)
    }

    fn sweep_expired(&self, now_unix_ms: u64, ttl_ms: u64) -> Result<usize> {
        let mut entries = self
            .first_seen_unix_ms
            .lock()
            .map_err(|_| anyhow!("seen store lock is poisoned"))?;
        let before = entries.len();
        entries.retain(|_, first_seen| now_unix_ms.saturating_sub(*first_seen) <= ttl_ms);
        Ok(before - entries.len())
    }

    fn retained_count(&self) -> Result<usize> {
        let entries = self
            .first_seen_unix_ms
            .lock()
            .map_err(|_| anyhow!("seen store lock is poisoned"))?;
        Ok(entries.len())
    }
}
