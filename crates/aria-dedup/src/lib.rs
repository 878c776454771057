//! Inbound-event deduplication for Aria.
//!
//! Messaging platforms redeliver webhook events on retry; processing the same
//! event twice means double replies. The deduplicator records every event id
//! it observes and reports repeats within a retention window. When the seen
//! store itself is degraded it fails open: duplicate delivery is preferable
//! to dropped messages.

pub mod deduplicator;
pub mod seen_store;

pub use deduplicator::{
    EventDeduplicator, DEFAULT_DEDUP_SWEEP_INTERVAL_MS, DEFAULT_DEDUP_TTL_MS,
};
pub use seen_store::{InMemorySeenStore, SeenStore};
