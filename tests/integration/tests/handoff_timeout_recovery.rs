//! Handoff lifecycle against the file-backed store: persistence across
//! coordinator restarts and timeout recovery with an audit trail.

use std::sync::Arc;
use std::time::Duration;

use aria_handoff::{
    read_handoff_audit_events, FileHandoffStore, HandoffAuditEventType, HandoffCoordinator,
    HandoffRecord, HandoffStatus, InMemoryHandoffStore,
};
use aria_resilience::InMemoryBreakerStore;

fn file_coordinator(state_dir: &std::path::Path) -> HandoffCoordinator {
    HandoffCoordinator::new(
        Arc::new(FileHandoffStore::new(state_dir)),
        Arc::new(InMemoryBreakerStore::new()),
    )
}

#[tokio::test]
async fn integration_handoff_state_survives_coordinator_restart() {
    let tempdir = tempfile::tempdir().expect("tempdir");

    {
        let coordinator = file_coordinator(tempdir.path());
        assert!(coordinator.request_handoff("user-1", "need a person").await);
        assert!(coordinator.start_handoff("user-1", "admin1").await);
    }

    // A fresh coordinator over the same state directory sees the takeover.
    let reopened = file_coordinator(tempdir.path());
    assert_eq!(
        reopened.get_status("user-1").await,
        HandoffStatus::HumanActive
    );
    let details = reopened.get_details("user-1").await.expect("details");
    assert_eq!(details.admin_id.as_deref(), Some("admin1"));
}

#[tokio::test]
async fn integration_timeout_sweep_resumes_and_audits_on_disk() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let coordinator = file_coordinator(tempdir.path()).with_default_timeout_ms(0);

    assert!(coordinator.request_handoff("user-1", "help me").await);
    assert!(coordinator.start_handoff("user-1", "admin1").await);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(coordinator.check_timeouts().await, 1);
    assert_eq!(coordinator.get_status("user-1").await, HandoffStatus::Ai);
    // The record is back at Ai, so a second sweep finds nothing.
    assert_eq!(coordinator.check_timeouts().await, 0);

    let events = read_handoff_audit_events(tempdir.path()).expect("read audit");
    let event_types: Vec<HandoffAuditEventType> =
        events.iter().map(|event| event.event_type).collect();
    assert_eq!(
        event_types,
        [
            HandoffAuditEventType::HandoffRequested,
            HandoffAuditEventType::HandoffStarted,
            HandoffAuditEventType::TimeoutResumed,
        ]
    );
    assert!(events.iter().all(|event| event.user_id == "user-1"));
}

#[tokio::test]
async fn integration_past_due_record_resumes_lazily_on_status_read() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FileHandoffStore::new(tempdir.path()));
    aria_handoff::HandoffStore::write_record(
        store.as_ref(),
        HandoffRecord {
            user_id: "user-1".to_string(),
            status: HandoffStatus::PendingHuman,
            requested_unix_ms: Some(1_000),
            admin_id: None,
            timeout_unix_ms: Some(2_000),
        },
    )
    .await
    .expect("seed record");

    let coordinator = HandoffCoordinator::new(store, Arc::new(InMemoryBreakerStore::new()));
    assert_eq!(coordinator.get_status("user-1").await, HandoffStatus::Ai);

    let events = read_handoff_audit_events(tempdir.path()).expect("read audit");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, HandoffAuditEventType::TimeoutResumed);
}

#[tokio::test]
async fn integration_admin_resume_notes_are_recorded_in_memory_trail() {
    let store = Arc::new(InMemoryHandoffStore::new());
    let coordinator = HandoffCoordinator::new(
        store.clone(),
        Arc::new(InMemoryBreakerStore::new()),
    );
    assert!(coordinator.request_handoff("user-1", "help").await);
    assert!(coordinator.start_handoff("user-1", "admin1").await);
    assert!(
        coordinator
            .resume_ai(
                "user-1",
                Some("admin1"),
                aria_handoff::HandoffResumeReason::AdminResumed,
            )
            .await
    );
    let events = store.audit_events().expect("audit");
    let resumed = events
        .iter()
        .find(|event| event.event_type == HandoffAuditEventType::AdminResumed)
        .expect("admin resume event");
    assert_eq!(resumed.admin_id.as_deref(), Some("admin1"));
}
