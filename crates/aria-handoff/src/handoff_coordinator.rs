use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use aria_core::{current_unix_timestamp_ms, is_expired_unix_ms};
use aria_resilience::{guarded_call, BreakerStore, GuardedCallPolicy};

use crate::handoff_contract::{
    HandoffAuditEvent, HandoffAuditEventType, HandoffRecord, HandoffResumeReason, HandoffStatus,
    DEFAULT_HANDOFF_TIMEOUT_MS,
};
use crate::handoff_store::HandoffStore;

pub const HANDOFF_STORE_DEPENDENCY_KEY: &str = "handoff_store";
pub const STAFF_NOTIFIER_DEPENDENCY_KEY: &str = "staff_notifier";
pub const DEFAULT_HANDOFF_READ_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_NOTIFY_TIMEOUT_MS: u64 = 5_000;
const AUDIT_NOTES_CAP_CHARS: usize = 500;

/// Messaging collaborator for operator alerts. Only staff notifications go
/// through here; the user-facing reply path is owned elsewhere.
#[async_trait]
pub trait StaffNotifier: Send + Sync {
    async fn notify(&self, user_id: &str, message: &str) -> Result<()>;
}

/// Owns every transition of the per-user handoff record.
///
/// Transitions read-then-write the same record without a transaction guard;
/// concurrent admin actions on the same user are last-write-wins. Status
/// reads fail toward automation: any store degradation yields `Ai`.
#[derive(Clone)]
pub struct HandoffCoordinator {
    store: Arc<dyn HandoffStore>,
    notifier: Option<Arc<dyn StaffNotifier>>,
    breakers: Arc<dyn BreakerStore>,
    breaker_policy: GuardedCallPolicy,
    default_timeout_ms: u64,
    read_timeout_ms: u64,
}

impl HandoffCoordinator {
    pub fn new(store: Arc<dyn HandoffStore>, breakers: Arc<dyn BreakerStore>) -> Self {
        Self {
            store,
            notifier: None,
            breakers,
            breaker_policy: GuardedCallPolicy::default(),
            default_timeout_ms: DEFAULT_HANDOFF_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_HANDOFF_READ_TIMEOUT_MS,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn StaffNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_default_timeout_ms(mut self, default_timeout_ms: u64) -> Self {
        self.default_timeout_ms = default_timeout_ms;
        self
    }

    pub fn with_read_timeout_ms(mut self, read_timeout_ms: u64) -> Self {
        self.read_timeout_ms = read_timeout_ms;
        self
    }

    /// Current status for `user_id`. A past-due non-`Ai` record is resumed to
    /// `Ai` as a side effect before returning. Store degradation (breaker
    /// open, timeout, error) falls back to `Ai`.
    pub async fn get_status(&self, user_id: &str) -> HandoffStatus {
        let store = self.store.clone();
        let owned_user_id = user_id.to_string();
        let outcome = guarded_call(
            self.breakers.as_ref(),
            self.breaker_policy,
            HANDOFF_STORE_DEPENDENCY_KEY,
            self.read_timeout_ms,
            None,
            async move { store.read_record(&owned_user_id).await },
        )
        .await;
        if outcome.degraded() {
            return HandoffStatus::Ai;
        }
        let Some(record) = outcome.value else {
            return HandoffStatus::Ai;
        };
        if record.status.is_human_controlled()
            && is_expired_unix_ms(record.timeout_unix_ms, current_unix_timestamp_ms())
        {
            self.resume_record(record, None, HandoffResumeReason::TimeoutResumed)
                .await;
            return HandoffStatus::Ai;
        }
        record.status
    }

    /// Record lookup for admin-facing listings. Returns `None` on store
    /// degradation as well as for users with no record.
    pub async fn get_details(&self, user_id: &str) -> Option<HandoffRecord> {
        match self.store.read_record(user_id).await {
            Ok(record) => record,
            Err(error) => {
                eprintln!(
                    "handoff details read failed: user_id={} reason_code=handoff_store_error detail={}",
                    user_id, error
                );
                None
            }
        }
    }

    /// Moves the user toward human control. Idempotent: an existing
    /// pending/active record is left untouched and reported as success.
    /// Notifies staff fire-and-forget on a fresh request.
    pub async fn request_handoff(&self, user_id: &str, message: &str) -> bool {
        let record = match self.store.read_record(user_id).await {
            Ok(record) => record.unwrap_or_else(|| HandoffRecord::new_ai(user_id)),
            Err(error) => {
                eprintln!(
                    "handoff request read failed: user_id={} reason_code=handoff_store_error detail={}",
                    user_id, error
                );
                return false;
            }
        };
        if record.status.is_human_controlled() {
            return true;
        }

        let now_unix_ms = current_unix_timestamp_ms();
        let updated = HandoffRecord {
            user_id: user_id.to_string(),
            status: HandoffStatus::PendingHuman,
            requested_unix_ms: Some(now_unix_ms),
            admin_id: None,
            timeout_unix_ms: Some(now_unix_ms.saturating_add(self.default_timeout_ms)),
        };
        if !self
            .write_with_audit(
                updated,
                HandoffAuditEventType::HandoffRequested,
                None,
                Some(message),
            )
            .await
        {
            return false;
        }
        self.send_notification(
            user_id,
            &format!("human handoff requested: user_id={user_id} message={message}"),
        );
        true
    }

    /// Admin takeover: `PendingHuman` -> `HumanActive`, records the admin and
    /// refreshes the timeout window.
    pub async fn start_handoff(&self, user_id: &str, admin_id: &str) -> bool {
        let record = match self.store.read_record(user_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                eprintln!(
                    "handoff start skipped: user_id={} reason_code=no_pending_request",
                    user_id
                );
                return false;
            }
            Err(error) => {
                eprintln!(
                    "handoff start read failed: user_id={} reason_code=handoff_store_error detail={}",
                    user_id, error
                );
                return false;
            }
        };
        if record.status != HandoffStatus::PendingHuman {
            eprintln!(
                "handoff start skipped: user_id={} reason_code=invalid_transition status={}",
                user_id,
                record.status.as_str()
            );
            return false;
        }

        let now_unix_ms = current_unix_timestamp_ms();
        let updated = HandoffRecord {
            status: HandoffStatus::HumanActive,
            admin_id: Some(admin_id.to_string()),
            timeout_unix_ms: Some(now_unix_ms.saturating_add(self.default_timeout_ms)),
            ..record
        };
        self.write_with_audit(
            updated,
            HandoffAuditEventType::HandoffStarted,
            Some(admin_id),
            None,
        )
        .await
    }

    /// Returns control to the AI from either human-controlled state, clearing
    /// the admin and timeout. Returns false when there was nothing to resume.
    pub async fn resume_ai(
        &self,
        user_id: &str,
        admin_id: Option<&str>,
        reason: HandoffResumeReason,
    ) -> bool {
        let record = match self.store.read_record(user_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(error) => {
                eprintln!(
                    "handoff resume read failed: user_id={} reason_code=handoff_store_error detail={}",
                    user_id, error
                );
                return false;
            }
        };
        self.resume_record(record, admin_id, reason).await
    }

    /// Sweeps all non-`Ai` records and resumes those past due. Returns how
    /// many were resumed. Invoked periodically and opportunistically from the
    /// admin listing path.
    pub async fn check_timeouts(&self) -> usize {
        let records = match self.store.list_non_ai_records().await {
            Ok(records) => records,
            Err(error) => {
                eprintln!(
                    "handoff timeout sweep read failed: reason_code=handoff_store_error detail={}",
                    error
                );
                return 0;
            }
        };
        let now_unix_ms = current_unix_timestamp_ms();
        let mut resumed = 0;
        for record in records {
            if is_expired_unix_ms(record.timeout_unix_ms, now_unix_ms)
                && self
                    .resume_record(record, None, HandoffResumeReason::TimeoutResumed)
                    .await
            {
                resumed += 1;
            }
        }
        if resumed > 0 {
            println!("handoff timeout sweep: resumed={resumed}");
        }
        resumed
    }

    /// Dispatches a staff notification without awaiting it. The send runs
    /// under the notifier breaker with a per-call timeout; failures are
    /// logged and swallowed, and the transition path never blocks on
    /// messaging.
    pub fn send_notification(&self, user_id: &str, message: &str) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        let breakers = self.breakers.clone();
        let policy = self.breaker_policy;
        let user_id = user_id.to_string();
        let message = message.to_string();
        tokio::spawn(async move {
            guarded_call(
                breakers.as_ref(),
                policy,
                STAFF_NOTIFIER_DEPENDENCY_KEY,
                DEFAULT_NOTIFY_TIMEOUT_MS,
                (),
                async move { notifier.notify(&user_id, &message).await },
            )
            .await;
        });
    }

    /// Applies the resume transition once per observed snapshot: a record
    /// already back at `Ai` is left alone, so sequential lazy reads and
    /// sweeps append one audit event per timeout. Two concurrent observers
    /// of the same expiry are last-write-wins like every other transition.
    async fn resume_record(
        &self,
        record: HandoffRecord,
        admin_id: Option<&str>,
        reason: HandoffResumeReason,
    ) -> bool {
        if record.status == HandoffStatus::Ai {
            return false;
        }
        let updated = HandoffRecord::new_ai(&record.user_id);
        self.write_with_audit(
            updated,
            HandoffAuditEventType::from_resume_reason(reason),
            admin_id,
            Some(reason.as_str()),
        )
        .await
    }

    async fn write_with_audit(
        &self,
        record: HandoffRecord,
        event_type: HandoffAuditEventType,
        admin_id: Option<&str>,
        notes: Option<&str>,
    ) -> bool {
        let user_id = record.user_id.clone();
        if let Err(error) = self.store.write_record(record).await {
            eprintln!(
                "handoff write failed: user_id={} event_type={} reason_code=handoff_store_error detail={}",
                user_id,
                event_type.as_str(),
                error
            );
            return false;
        }
        let event = HandoffAuditEvent {
            user_id: user_id.clone(),
            conversation_id: None,
            event_type,
            admin_id: admin_id.map(str::to_string),
            notes: notes.map(truncate_notes),
            created_unix_ms: current_unix_timestamp_ms(),
        };
        // An audit append failure is logged, not surfaced: the transition
        // itself already took effect.
        if let Err(error) = self.store.append_audit(event).await {
            eprintln!(
                "handoff audit append failed: user_id={} event_type={} detail={}",
                user_id,
                event_type.as_str(),
                error
            );
        }
        true
    }
}

fn truncate_notes(raw: &str) -> String {
    if raw.chars().count() <= AUDIT_NOTES_CAP_CHARS {
        return raw.to_string();
    }
    raw.chars().take(AUDIT_NOTES_CAP_CHARS).collect()
}
