use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use aria_router::RoutingDecision;

/// Normalized inbound messaging-platform event. Event-id derivation (native
/// platform id or synthesized fallback key) is the ingress layer's concern;
/// the pipeline treats it as an opaque string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundEvent {
    pub event_id: String,
    pub user_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_payload: Option<Value>,
}

/// Downstream collaborator that runs the selected agent and produces the
/// user-facing reply (reply formatting itself is out of this core).
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(
        &self,
        user_id: &str,
        message: &str,
        decision: &RoutingDecision,
        conversation_id: Option<&str>,
    ) -> Result<()>;
}

/// Receives messages that arrive while a conversation is human-controlled,
/// so the operator sees them. Failures are logged, not retried.
#[async_trait]
pub trait HeldMessageSink: Send + Sync {
    async fn store_held_message(&self, user_id: &str, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `PipelineEventOutcome` values.
pub enum PipelineEventOutcome {
    DuplicateSkipped,
    HeldForHuman,
    HandoffRequested,
    HandoffRequestFailed,
    Dispatched {
        decision: RoutingDecision,
        user_resumed: bool,
    },
    DispatchFailed {
        decision: RoutingDecision,
    },
}

impl PipelineEventOutcome {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::DuplicateSkipped => "duplicate_skipped",
            Self::HeldForHuman => "held_for_human",
            Self::HandoffRequested => "handoff_requested",
            Self::HandoffRequestFailed => "handoff_request_failed",
            Self::Dispatched { .. } => "dispatched",
            Self::DispatchFailed { .. } => "dispatch_failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Public struct `PipelineRunSummary` used across Aria components.
pub struct PipelineRunSummary {
    pub processed: usize,
    pub duplicate_skips: usize,
    pub held_for_human: usize,
    pub handoff_requests: usize,
    pub handoff_request_failures: usize,
    pub user_resumes: usize,
    pub dispatched: usize,
    pub dispatch_failures: usize,
}

impl PipelineRunSummary {
    pub fn record(&mut self, outcome: &PipelineEventOutcome) {
        self.processed = self.processed.saturating_add(1);
        match outcome {
            PipelineEventOutcome::DuplicateSkipped => {
                self.duplicate_skips = self.duplicate_skips.saturating_add(1);
            }
            PipelineEventOutcome::HeldForHuman => {
                self.held_for_human = self.held_for_human.saturating_add(1);
            }
            PipelineEventOutcome::HandoffRequested => {
                self.handoff_requests = self.handoff_requests.saturating_add(1);
            }
            PipelineEventOutcome::HandoffRequestFailed => {
                self.handoff_request_failures = self.handoff_request_failures.saturating_add(1);
            }
            PipelineEventOutcome::Dispatched { user_resumed, .. } => {
                self.dispatched = self.dispatched.saturating_add(1);
                if *user_resumed {
                    self.user_resumes = self.user_resumes.saturating_add(1);
                }
            }
            PipelineEventOutcome::DispatchFailed { .. } => {
                self.dispatch_failures = self.dispatch_failures.saturating_add(1);
            }
        }
    }

    pub fn log(&self) {
        println!(
            "conversation pipeline summary: processed={} duplicate_skips={} held_for_human={} handoff_requests={} handoff_request_failures={} user_resumes={} dispatched={} dispatch_failures={}",
            self.processed,
            self.duplicate_skips,
            self.held_for_human,
            self.handoff_requests,
            self.handoff_request_failures,
            self.user_resumes,
            self.dispatched,
            self.dispatch_failures
        );
    }
}
