use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use aria_core::current_unix_timestamp_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `AgentKind` values.
pub enum AgentKind {
    General,
    Booking,
    Knowledge,
    ExpertSearch,
    Escalation,
}

impl AgentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Booking => "booking",
            Self::Knowledge => "knowledge",
            Self::ExpertSearch => "expert_search",
            Self::Escalation => "escalation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `RoutingReason` values.
pub enum RoutingReason {
    ExplicitAction,
    KeywordMatch,
    CrisisMatch,
    ModelClassified,
}

impl RoutingReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExplicitAction => "explicit_action",
            Self::KeywordMatch => "keyword_match",
            Self::CrisisMatch => "crisis_match",
            Self::ModelClassified => "model_classified",
        }
    }
}

/// Transient per-message routing outcome. Persistence is delegated to the
/// analytics collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingDecision {
    pub agent: AgentKind,
    pub reason: RoutingReason,
    #[serde(default)]
    pub keywords_matched: Vec<String>,
    #[serde(default)]
    pub is_crisis: bool,
}

impl RoutingDecision {
    /// The decision used whenever classification is unavailable.
    pub fn general_fallback() -> Self {
        Self {
            agent: AgentKind::General,
            reason: RoutingReason::ModelClassified,
            keywords_matched: Vec::new(),
            is_crisis: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `ClassifiedIntent` values.
pub enum ClassifiedIntent {
    General,
    BookingSearch,
    Crisis,
}

/// Parses a model-produced label through a strict allow-list. Anything
/// outside the closed set, including an empty label, is the default intent.
pub fn parse_classifier_label(raw: &str) -> ClassifiedIntent {
    match raw.trim().to_ascii_lowercase().as_str() {
        "booking_search" => ClassifiedIntent::BookingSearch,
        "crisis" => ClassifiedIntent::Crisis,
        "general" => ClassifiedIntent::General,
        _ => ClassifiedIntent::General,
    }
}

/// Structured, non-free-text user action carried alongside a message, for
/// example a booking button press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExplicitAction {
    BookExpert { expert_id: u64 },
}

/// Parses an explicit-action payload. A malformed payload is logged at info
/// level and treated as absence of the action, never as an error.
pub fn parse_explicit_action(payload: &Value) -> Option<ExplicitAction> {
    match serde_json::from_value::<ExplicitAction>(payload.clone()) {
        Ok(action) => Some(action),
        Err(error) => {
            eprintln!(
                "explicit action ignored: reason_code=malformed_action detail={}",
                error
            );
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `TurnSpeaker` values.
pub enum TurnSpeaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `ConversationTurn` used across Aria components.
pub struct ConversationTurn {
    pub speaker: TurnSpeaker,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: &str) -> Self {
        Self {
            speaker: TurnSpeaker::User,
            text: text.to_string(),
        }
    }

    pub fn assistant(text: &str) -> Self {
        Self {
            speaker: TurnSpeaker::Assistant,
            text: text.to_string(),
        }
    }
}

pub fn route_decision_trace_payload(
    user_id: &str,
    conversation_id: Option<&str>,
    decision: &RoutingDecision,
) -> Value {
    json!({
        "record_type": "routing_decision_trace_v1",
        "timestamp_unix_ms": current_unix_timestamp_ms(),
        "user_id": user_id,
        "conversation_id": conversation_id,
        "agent": decision.agent.as_str(),
        "reason": decision.reason.as_str(),
        "keywords_matched": decision.keywords_matched,
        "is_crisis": decision.is_crisis,
    })
}
