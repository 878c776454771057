use std::future::Future;
use std::time::Duration;

use anyhow::Result;

use aria_core::current_unix_timestamp_ms;

use crate::breaker::{
    BreakerDisposition, BreakerStore, DEFAULT_BREAKER_COOLDOWN_MS,
    DEFAULT_BREAKER_FAILURE_THRESHOLD,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Public struct `GuardedCallPolicy` used across Aria components.
pub struct GuardedCallPolicy {
    pub failure_threshold: u32,
    pub cooldown_ms: u64,
}

impl Default for GuardedCallPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_BREAKER_FAILURE_THRESHOLD,
            cooldown_ms: DEFAULT_BREAKER_COOLDOWN_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `GuardedCallStatus` values.
pub enum GuardedCallStatus {
    Success,
    BreakerOpen,
    TimedOut,
    Failed,
    Unconfigured,
}

impl GuardedCallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::BreakerOpen => "breaker_open",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
            Self::Unconfigured => "unconfigured",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `GuardedCallResult` used across Aria components.
pub struct GuardedCallResult<T> {
    pub value: T,
    pub status: GuardedCallStatus,
}

impl<T> GuardedCallResult<T> {
    /// True when the caller received the fallback instead of a real result.
    pub fn degraded(&self) -> bool {
        self.status != GuardedCallStatus::Success
    }
}

/// Races `operation` against `timeout_ms` under the breaker for
/// `dependency_key`. Never propagates an error: the caller receives either
/// the operation's value or `fallback`, with the outcome reason in `status`.
pub async fn guarded_call<T, F>(
    store: &dyn BreakerStore,
    policy: GuardedCallPolicy,
    dependency_key: &str,
    timeout_ms: u64,
    fallback: T,
    operation: F,
) -> GuardedCallResult<T>
where
    F: Future<Output = Result<T>>,
{
    let now_unix_ms = current_unix_timestamp_ms();
    match store.observe(dependency_key, now_unix_ms) {
        Ok(BreakerDisposition::Closed) => {}
        Ok(BreakerDisposition::Open) => {
            eprintln!(
                "guarded call short-circuited: dependency={} reason_code=breaker_open",
                dependency_key
            );
            return GuardedCallResult {
                value: fallback,
                status: GuardedCallStatus::BreakerOpen,
            };
        }
        Ok(BreakerDisposition::Unconfigured) => {
            eprintln!(
                "guarded call skipped: dependency={} reason_code=unconfigured",
                dependency_key
            );
            return GuardedCallResult {
                value: fallback,
                status: GuardedCallStatus::Unconfigured,
            };
        }
        // A degraded breaker store must not block the call path; fail open
        // and attempt the operation.
        Err(error) => {
            eprintln!(
                "guarded call breaker observe failed: dependency={} reason_code=breaker_store_error detail={}",
                dependency_key, error
            );
        }
    }

    match tokio::time::timeout(Duration::from_millis(timeout_ms), operation).await {
        Ok(Ok(value)) => {
            if let Err(error) = store.record_success(dependency_key) {
                eprintln!(
                    "guarded call breaker update failed: dependency={} reason_code=breaker_store_error detail={}",
                    dependency_key, error
                );
            }
            GuardedCallResult {
                value,
                status: GuardedCallStatus::Success,
            }
        }
        Ok(Err(error)) => {
            count_failure(store, policy, dependency_key);
            eprintln!(
                "guarded call failed: dependency={} reason_code=dependency_error detail={}",
                dependency_key, error
            );
            GuardedCallResult {
                value: fallback,
                status: GuardedCallStatus::Failed,
            }
        }
        Err(_) => {
            count_failure(store, policy, dependency_key);
            eprintln!(
                "guarded call timed out: dependency={} reason_code=dependency_timeout timeout_ms={}",
                dependency_key, timeout_ms
            );
            GuardedCallResult {
                value: fallback,
                status: GuardedCallStatus::TimedOut,
            }
        }
    }
}

fn count_failure(store: &dyn BreakerStore, policy: GuardedCallPolicy, dependency_key: &str) {
    let now_unix_ms = current_unix_timestamp_ms();
    match store.record_failure(
        dependency_key,
        now_unix_ms,
        policy.failure_threshold,
        policy.cooldown_ms,
    ) {
        Ok(state) if state.open_until_unix_ms.is_some() => {
            eprintln!(
                "guarded call opened breaker: dependency={} consecutive_failures={} cooldown_ms={}",
                dependency_key, state.consecutive_failures, policy.cooldown_ms
            );
        }
        Ok(_) => {}
        Err(error) => {
            eprintln!(
                "guarded call breaker update failed: dependency={} reason_code=breaker_store_error detail={}",
                dependency_key, error
            );
        }
    }
}
