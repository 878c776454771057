//! Resilience primitives shared by every external-dependency call in Aria.
//!
//! Provides a per-dependency circuit breaker registry and a timeout-guarded
//! call wrapper. Callers always receive either the real result or their
//! fallback value; degraded outcomes are observable only through reason-coded
//! logs and the returned status.

pub mod breaker;
pub mod guarded_call;

pub use breaker::{
    BreakerDisposition, BreakerState, BreakerStore, InMemoryBreakerStore,
    DEFAULT_BREAKER_COOLDOWN_MS, DEFAULT_BREAKER_FAILURE_THRESHOLD,
};
pub use guarded_call::{guarded_call, GuardedCallPolicy, GuardedCallResult, GuardedCallStatus};
