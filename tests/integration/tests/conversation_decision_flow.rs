//! End-to-end decision-flow scenarios across dedup, handoff, routing, and
//! dispatch.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;

use aria_dedup::{EventDeduplicator, InMemorySeenStore};
use aria_handoff::{HandoffCoordinator, HandoffStatus, InMemoryHandoffStore};
use aria_pipeline::{
    AgentExecutor, ConversationPipeline, InboundEvent, PipelineEventOutcome, PipelineRunSummary,
};
use aria_resilience::InMemoryBreakerStore;
use aria_router::{
    AgentKind, AgentRouter, ConversationTurn, IntentClassifier, RouterTriggerFile,
    RoutingDecision, RoutingReason,
};
use aria_session::{ConversationPersistence, InMemorySessionStore, SessionTracker};

struct ScriptedClassifier {
    label: &'static str,
    fail: bool,
}

#[async_trait]
impl IntentClassifier for ScriptedClassifier {
    async fn classify(
        &self,
        _system_prompt: &str,
        _recent_turns: &[ConversationTurn],
        _current_message: &str,
    ) -> Result<String> {
        if self.fail {
            bail!("simulated classifier outage")
        }
        Ok(self.label.to_string())
    }
}

struct ScriptedPersistence;

#[async_trait]
impl ConversationPersistence for ScriptedPersistence {
    async fn create_conversation(&self, user_id: &str) -> Result<String> {
        Ok(format!("conv-{user_id}"))
    }
}

#[derive(Default)]
struct RecordingExecutor {
    dispatches: Mutex<Vec<RoutingDecision>>,
}

#[async_trait]
impl AgentExecutor for RecordingExecutor {
    async fn execute(
        &self,
        _user_id: &str,
        _message: &str,
        decision: &RoutingDecision,
        _conversation_id: Option<&str>,
    ) -> Result<()> {
        self.dispatches
            .lock()
            .expect("executor lock")
            .push(decision.clone());
        Ok(())
    }
}

struct Fixture {
    pipeline: ConversationPipeline,
    executor: Arc<RecordingExecutor>,
    handoff: HandoffCoordinator,
}

fn fixture(classifier: ScriptedClassifier) -> Fixture {
    let breakers = Arc::new(InMemoryBreakerStore::new());
    let handoff = HandoffCoordinator::new(Arc::new(InMemoryHandoffStore::new()), breakers.clone());
    let executor = Arc::new(RecordingExecutor::default());
    let pipeline = ConversationPipeline::new(
        EventDeduplicator::new(Arc::new(InMemorySeenStore::new())),
        SessionTracker::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(ScriptedPersistence),
            breakers.clone(),
        ),
        handoff.clone(),
        AgentRouter::new(RouterTriggerFile::default(), Arc::new(classifier), breakers),
        executor.clone(),
    );
    Fixture {
        pipeline,
        executor,
        handoff,
    }
}

fn event(event_id: &str, user_id: &str, text: &str) -> InboundEvent {
    InboundEvent {
        event_id: event_id.to_string(),
        user_id: user_id.to_string(),
        text: text.to_string(),
        action_payload: None,
    }
}

#[tokio::test]
async fn integration_full_handoff_lifecycle_gates_and_restores_dispatch() {
    let fixture = fixture(ScriptedClassifier {
        label: "general",
        fail: false,
    });
    let mut summary = PipelineRunSummary::default();

    // Normal traffic reaches the executor.
    let outcome = fixture
        .pipeline
        .process_event(&event("evt-1", "user-1", "hello"), &[])
        .await;
    summary.record(&outcome);
    assert!(matches!(outcome, PipelineEventOutcome::Dispatched { .. }));

    // The user asks for a person: pending, nothing dispatched.
    let outcome = fixture
        .pipeline
        .process_event(&event("evt-2", "user-1", "請轉真人客服"), &[])
        .await;
    summary.record(&outcome);
    assert_eq!(outcome, PipelineEventOutcome::HandoffRequested);
    assert_eq!(
        fixture.handoff.get_status("user-1").await,
        HandoffStatus::PendingHuman
    );

    // An admin takes over; subsequent messages are held.
    assert!(fixture.handoff.start_handoff("user-1", "admin1").await);
    let outcome = fixture
        .pipeline
        .process_event(&event("evt-3", "user-1", "anyone there?"), &[])
        .await;
    summary.record(&outcome);
    assert_eq!(outcome, PipelineEventOutcome::HeldForHuman);

    // The user resumes the bot and traffic flows again.
    let outcome = fixture
        .pipeline
        .process_event(&event("evt-4", "user-1", "resume ai"), &[])
        .await;
    summary.record(&outcome);
    assert!(matches!(
        outcome,
        PipelineEventOutcome::Dispatched {
            user_resumed: true,
            ..
        }
    ));
    assert_eq!(fixture.handoff.get_status("user-1").await, HandoffStatus::Ai);

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.handoff_requests, 1);
    assert_eq!(summary.held_for_human, 1);
    assert_eq!(summary.user_resumes, 1);
    assert_eq!(summary.dispatched, 2);
    assert_eq!(
        fixture.executor.dispatches.lock().expect("executor lock").len(),
        2
    );
}

#[tokio::test]
async fn integration_duplicate_delivery_never_reaches_executor_twice() {
    let fixture = fixture(ScriptedClassifier {
        label: "general",
        fail: false,
    });
    let inbound = event("evt-1", "user-1", "hello");
    for expected_dispatches in [1_usize, 1, 1] {
        fixture.pipeline.process_event(&inbound, &[]).await;
        assert_eq!(
            fixture.executor.dispatches.lock().expect("executor lock").len(),
            expected_dispatches
        );
    }
}

#[tokio::test]
async fn integration_classifier_outage_degrades_to_general_agent() {
    let fixture = fixture(ScriptedClassifier {
        label: "unused",
        fail: true,
    });
    let outcome = fixture
        .pipeline
        .process_event(&event("evt-1", "user-1", "幫我看看"), &[])
        .await;
    let PipelineEventOutcome::Dispatched { decision, .. } = outcome else {
        panic!("expected dispatch");
    };
    assert_eq!(decision.agent, AgentKind::General);
    assert_eq!(decision.reason, RoutingReason::ModelClassified);
    assert!(decision.keywords_matched.is_empty());
}

#[tokio::test]
async fn integration_crisis_classification_escalates() {
    let fixture = fixture(ScriptedClassifier {
        label: "crisis",
        fail: false,
    });
    let outcome = fixture
        .pipeline
        .process_event(&event("evt-1", "user-1", "我想自殺"), &[])
        .await;
    let PipelineEventOutcome::Dispatched { decision, .. } = outcome else {
        panic!("expected dispatch");
    };
    assert_eq!(decision.agent, AgentKind::Escalation);
    assert!(decision.is_crisis);
    assert_eq!(decision.reason, RoutingReason::ModelClassified);
}

#[tokio::test]
async fn integration_explicit_booking_action_bypasses_classifier() {
    let fixture = fixture(ScriptedClassifier {
        label: "unused",
        fail: true,
    });
    let mut inbound = event("evt-1", "user-1", "預約專家 7");
    inbound.action_payload = Some(serde_json::json!({"kind": "book_expert", "expert_id": 7}));
    let outcome = fixture.pipeline.process_event(&inbound, &[]).await;
    let PipelineEventOutcome::Dispatched { decision, .. } = outcome else {
        panic!("expected dispatch");
    };
    assert_eq!(decision.agent, AgentKind::Booking);
    assert_eq!(decision.reason, RoutingReason::ExplicitAction);
}
