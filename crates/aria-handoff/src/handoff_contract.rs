use serde::{Deserialize, Serialize};

pub const DEFAULT_HANDOFF_TIMEOUT_MS: u64 = 3_600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `HandoffStatus` values.
pub enum HandoffStatus {
    #[default]
    Ai,
    PendingHuman,
    HumanActive,
}

impl HandoffStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::PendingHuman => "pending_human",
            Self::HumanActive => "human_active",
        }
    }

    pub fn is_human_controlled(self) -> bool {
        self != Self::Ai
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `HandoffResumeReason` values.
pub enum HandoffResumeReason {
    AdminResumed,
    UserResumed,
    TimeoutResumed,
}

impl HandoffResumeReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdminResumed => "admin_resumed",
            Self::UserResumed => "user_resumed",
            Self::TimeoutResumed => "timeout_resumed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `HandoffAuditEventType` values.
pub enum HandoffAuditEventType {
    HandoffRequested,
    HandoffStarted,
    AdminResumed,
    UserResumed,
    TimeoutResumed,
}

impl HandoffAuditEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HandoffRequested => "handoff_requested",
            Self::HandoffStarted => "handoff_started",
            Self::AdminResumed => "admin_resumed",
            Self::UserResumed => "user_resumed",
            Self::TimeoutResumed => "timeout_resumed",
        }
    }

    pub fn from_resume_reason(reason: HandoffResumeReason) -> Self {
        match reason {
            HandoffResumeReason::AdminResumed => Self::AdminResumed,
            HandoffResumeReason::UserResumed => Self::UserResumed,
            HandoffResumeReason::TimeoutResumed => Self::TimeoutResumed,
        }
    }
}

/// One authoritative record per user's most recent conversation.
///
/// Invariants: a non-`Ai` status always carries `timeout_unix_ms`; an `Ai`
/// status never carries `admin_id` or `timeout_unix_ms`. Mutated only through
/// `HandoffCoordinator` transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandoffRecord {
    pub user_id: String,
    pub status: HandoffStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_unix_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_unix_ms: Option<u64>,
}

impl HandoffRecord {
    pub fn new_ai(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            status: HandoffStatus::Ai,
            requested_unix_ms: None,
            admin_id: None,
            timeout_unix_ms: None,
        }
    }
}

/// Immutable audit log entry, one per transition, for operator visibility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandoffAuditEvent {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub event_type: HandoffAuditEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_unix_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_status_serializes_snake_case() {
        let raw = serde_json::to_string(&HandoffStatus::PendingHuman).expect("serialize");
        assert_eq!(raw, "\"pending_human\"");
        let parsed: HandoffStatus = serde_json::from_str("\"human_active\"").expect("parse");
        assert_eq!(parsed, HandoffStatus::HumanActive);
    }

    #[test]
    fn unit_audit_event_type_mirrors_resume_reason() {
        for (reason, expected) in [
            (HandoffResumeReason::AdminResumed, "admin_resumed"),
            (HandoffResumeReason::UserResumed, "user_resumed"),
            (HandoffResumeReason::TimeoutResumed, "timeout_resumed"),
        ] {
            assert_eq!(
                HandoffAuditEventType::from_resume_reason(reason).as_str(),
                expected
            );
            assert_eq!(reason.as_str(), expected);
        }
    }

    #[test]
    fn unit_record_round_trips_without_optional_fields() {
        let record = HandoffRecord::new_ai("user-1");
        let raw = serde_json::to_string(&record).expect("serialize");
        assert!(!raw.contains("admin_id"));
        let parsed: HandoffRecord = serde_json::from_str(&raw).expect("parse");
        assert_eq!(parsed, record);
    }
}
