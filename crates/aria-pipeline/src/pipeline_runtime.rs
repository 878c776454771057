use std::sync::Arc;

use aria_dedup::EventDeduplicator;
use aria_handoff::{HandoffCoordinator, HandoffResumeReason};
use aria_router::{parse_explicit_action, AgentRouter, ConversationTurn, ExplicitAction};
use aria_session::SessionTracker;

use crate::pipeline_contract::{
    AgentExecutor, HeldMessageSink, InboundEvent, PipelineEventOutcome,
};

/// One decision pass per inbound event. Per-user state (dedup, handoff,
/// session) is safe under concurrent events for the same user; cross-user
/// events are independent and run without coordination.
#[derive(Clone)]
pub struct ConversationPipeline {
    deduplicator: EventDeduplicator,
    sessions: SessionTracker,
    handoff: HandoffCoordinator,
    router: AgentRouter,
    executor: Arc<dyn AgentExecutor>,
    held_messages: Option<Arc<dyn HeldMessageSink>>,
}

impl ConversationPipeline {
    pub fn new(
        deduplicator: EventDeduplicator,
        sessions: SessionTracker,
        handoff: HandoffCoordinator,
        router: AgentRouter,
        executor: Arc<dyn AgentExecutor>,
    ) -> Self {
        Self {
            deduplicator,
            sessions,
            handoff,
            router,
            executor,
            held_messages: None,
        }
    }

    pub fn with_held_message_sink(mut self, sink: Arc<dyn HeldMessageSink>) -> Self {
        self.held_messages = Some(sink);
        self
    }

    pub async fn process_event(
        &self,
        event: &InboundEvent,
        recent_turns: &[ConversationTurn],
    ) -> PipelineEventOutcome {
        if self.deduplicator.is_duplicate(&event.event_id) {
            println!(
                "conversation pipeline skipped event: event_id={} reason_code=duplicate",
                event.event_id
            );
            return PipelineEventOutcome::DuplicateSkipped;
        }

        let status = self.handoff.get_status(&event.user_id).await;
        let mut user_resumed = false;
        if status.is_human_controlled() {
            if self.router.is_resume_trigger(&event.text) {
                user_resumed = self
                    .handoff
                    .resume_ai(&event.user_id, None, HandoffResumeReason::UserResumed)
                    .await;
            } else {
                self.hold_message(event).await;
                return PipelineEventOutcome::HeldForHuman;
            }
        } else if self.router.is_handoff_trigger(&event.text) {
            // The AI must not answer a request for a person; the state
            // machine notifies staff as a side effect.
            if self
                .handoff
                .request_handoff(&event.user_id, &event.text)
                .await
            {
                return PipelineEventOutcome::HandoffRequested;
            }
            eprintln!(
                "conversation pipeline handoff request not recorded: user_id={} reason_code=handoff_store_error",
                event.user_id
            );
            return PipelineEventOutcome::HandoffRequestFailed;
        }

        let conversation_id = self
            .sessions
            .get_or_create_conversation(&event.user_id)
            .await;
        let explicit_action: Option<ExplicitAction> = event
            .action_payload
            .as_ref()
            .and_then(parse_explicit_action);
        let decision = self
            .router
            .decide(
                &event.text,
                &event.user_id,
                recent_turns,
                explicit_action.as_ref(),
            )
            .await;

        let dispatched = self
            .executor
            .execute(
                &event.user_id,
                &event.text,
                &decision,
                conversation_id.as_deref(),
            )
            .await;
        self.sessions.touch(&event.user_id);

        match dispatched {
            Ok(()) => PipelineEventOutcome::Dispatched {
                decision,
                user_resumed,
            },
            Err(error) => {
                eprintln!(
                    "conversation pipeline dispatch failed: user_id={} agent={} reason_code=executor_error detail={}",
                    event.user_id,
                    decision.agent.as_str(),
                    error
                );
                PipelineEventOutcome::DispatchFailed { decision }
            }
        }
    }

    async fn hold_message(&self, event: &InboundEvent) {
        let Some(sink) = self.held_messages.as_ref() else {
            println!(
                "conversation pipeline held message: user_id={} reason_code=human_controlled",
                event.user_id
            );
            return;
        };
        if let Err(error) = sink.store_held_message(&event.user_id, &event.text).await {
            eprintln!(
                "held message store failed: user_id={} reason_code=held_sink_error detail={}",
                event.user_id, error
            );
        }
    }
}
