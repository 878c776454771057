//! Human/AI handoff state machine for Aria conversations.
//!
//! Owns the per-user handoff status, its transitions, timeouts, and audit
//! trail. Status reads fail toward automation: a store outage yields `Ai`
//! rather than stranding a user in human mode. Staff notifications are
//! dispatched fire-and-forget and never block a transition.

pub mod handoff_contract;
pub mod handoff_coordinator;
pub mod handoff_store;

pub use handoff_contract::{
    HandoffAuditEvent, HandoffAuditEventType, HandoffRecord, HandoffResumeReason, HandoffStatus,
    DEFAULT_HANDOFF_TIMEOUT_MS,
};
pub use handoff_coordinator::{
    HandoffCoordinator, StaffNotifier, DEFAULT_HANDOFF_READ_TIMEOUT_MS,
    DEFAULT_NOTIFY_TIMEOUT_MS, HANDOFF_STORE_DEPENDENCY_KEY, STAFF_NOTIFIER_DEPENDENCY_KEY,
};
pub use handoff_store::{
    read_handoff_audit_events, FileHandoffStore, HandoffStore, InMemoryHandoffStore,
    HANDOFF_AUDIT_FILE_NAME, HANDOFF_RECORDS_FILE_NAME,
};
