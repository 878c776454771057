use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BREAKER_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_BREAKER_COOLDOWN_MS: u64 = 60_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Public struct `BreakerState` used across Aria components.
pub struct BreakerState {
    pub consecutive_failures: u32,
    pub open_until_unix_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `BreakerDisposition` values.
pub enum BreakerDisposition {
    Closed,
    Open,
    Unconfigured,
}

impl BreakerDisposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Unconfigured => "unconfigured",
        }
    }
}

/// Per-dependency breaker bookkeeping keyed by an opaque dependency key.
///
/// The in-memory implementation covers single-instance deployments and tests;
/// multi-instance deployments can back this trait with a shared key-value
/// store without touching callers.
pub trait BreakerStore: Send + Sync {
    /// Reports whether calls to `dependency_key` may proceed. An open window
    /// that has elapsed resets the state before reporting `Closed`.
    fn observe(&self, dependency_key: &str, now_unix_ms: u64) -> Result<BreakerDisposition>;

    /// Clears the failure streak after a successful call.
    fn record_success(&self, dependency_key: &str) -> Result<()>;

    /// Counts one failure; opens the breaker for `cooldown_ms` once the
    /// streak reaches `failure_threshold`. Returns the updated state.
    fn record_failure(
        &self,
        dependency_key: &str,
        now_unix_ms: u64,
        failure_threshold: u32,
        cooldown_ms: u64,
    ) -> Result<BreakerState>;

    /// Marks a dependency as permanently unavailable (for example, no
    /// connection string was configured). It is never attempted afterwards.
    fn mark_unconfigured(&self, dependency_key: &str) -> Result<()>;

    /// Returns the current state for diagnostics, if any exists.
    fn snapshot(&self, dependency_key: &str) -> Result<Option<BreakerState>>;
}

#[derive(Debug, Clone, Default)]
struct BreakerEntry {
    state: BreakerState,
    unconfigured: bool,
}

#[derive(Debug, Default)]
/// Public struct `InMemoryBreakerStore` used across Aria components.
pub struct InMemoryBreakerStore {
    entries: Mutex<BTreeMap<String, BreakerEntry>>,
}

impl InMemoryBreakerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, BreakerEntry>) -> T,
    ) -> Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("breaker store lock is poisoned"))?;
        Ok(apply(&mut entries))
    }
}

impl BreakerStore for InMemoryBreakerStore {
    fn observe(&self, dependency_key: &str, now_unix_ms: u64) -> Result<BreakerDisposition> {
        self.with_entries(|entries| {
            let Some(entry) = entries.get_mut(dependency_key) else {
                return BreakerDisposition::Closed;
            };
            if entry.unconfigured {
                return BreakerDisposition::Unconfigured;
            }
            match entry.state.open_until_unix_ms {
                Some(open_until) if now_unix_ms >= open_until => {
                    entry.state = BreakerState::default();
                    BreakerDisposition::Closed
                }
                Some(_) => BreakerDisposition::Open,
                None => BreakerDisposition::Closed,
            }
        })
    }

    fn record_success(&self, dependency_key: &str) -> Result<()> {
        self.with_entries(|entries| {
            if let Some(entry) = entries.get_mut(dependency_key) {
                entry.state = BreakerState::default();
            }
        })
    }

    fn record_failure(
        &self,
        dependency_key: &str,
        now_unix_ms: u64,
        failure_threshold: u32,
        cooldown_ms: u64,
    ) -> Result<BreakerState> {
        self.with_entries(|entries| {
            let entry = entries.entry(dependency_key.to_string()).or_default();
            entry.state.consecutive_failures = entry.state.consecutive_failures.saturating_add(1);
            if entry.state.consecutive_failures >= failure_threshold {
                entry.state.open_until_unix_ms = Some(now_unix_ms.saturating_add(cooldown_ms));
            }
            entry.state.clone()
        })
    }

    fn mark_unconfigured(&self, dependency_key: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries
                .entry(dependency_key.to_string())
                .or_default()
                .unconfigured = true;
        })
    }

    fn snapshot(&self, dependency_key: &str) -> Result<Option<BreakerState>> {
        self.with_entries(|entries| entries.get(dependency_key).map(|entry| entry.state.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_observe_defaults_to_closed_for_unknown_dependency() {
        let store = InMemoryBreakerStore::new();
        let disposition = store.observe("persistence", 1_000).expect("observe");
        assert_eq!(disposition, BreakerDisposition::Closed);
    }

    #[test]
    fn unit_record_failure_opens_only_at_threshold() {
        let store = InMemoryBreakerStore::new();
        let first = store
            .record_failure("llm", 1_000, 3, 60_000)
            .expect("failure");
        assert_eq!(first.consecutive_failures, 1);
        assert!(first.open_until_unix_ms.is_none());
        store.record_failure("llm", 1_000, 3, 60_000).expect("failure");
        let third = store
            .record_failure("llm", 1_000, 3, 60_000)
            .expect("failure");
        assert_eq!(third.consecutive_failures, 3);
        assert_eq!(third.open_until_unix_ms, Some(61_000));
    }

    #[test]
    fn functional_elapsed_cooldown_resets_state_on_observe() {
        let store = InMemoryBreakerStore::new();
        for _ in 0..3 {
            store.record_failure("llm", 1_000, 3, 5_000).expect("failure");
        }
        assert_eq!(
            store.observe("llm", 2_000).expect("observe"),
            BreakerDisposition::Open
        );
        assert_eq!(
            store.observe("llm", 6_000).expect("observe"),
            BreakerDisposition::Closed
        );
        let snapshot = store.snapshot("llm").expect("snapshot").expect("state");
        assert_eq!(snapshot, BreakerState::default());
    }

    #[test]
    fn regression_success_clears_failure_streak() {
        let store = InMemoryBreakerStore::new();
        store.record_failure("send", 1_000, 3, 5_000).expect("failure");
        store.record_failure("send", 1_000, 3, 5_000).expect("failure");
        store.record_success("send").expect("success");
        let state = store.snapshot("send").expect("snapshot").expect("state");
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.open_until_unix_ms.is_none());
    }

    #[test]
    fn unit_unconfigured_dependency_reports_unconfigured() {
        let store = InMemoryBreakerStore::new();
        store.mark_unconfigured("analytics").expect("mark");
        assert_eq!(
            store.observe("analytics", 1_000).expect("observe"),
            BreakerDisposition::Unconfigured
        );
    }
}
