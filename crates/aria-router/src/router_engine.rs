use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use aria_resilience::{guarded_call, BreakerStore, GuardedCallPolicy};

use crate::router_contract::{
    parse_classifier_label, AgentKind, ClassifiedIntent, ConversationTurn, ExplicitAction,
    RoutingDecision, RoutingReason,
};
use crate::router_triggers::RouterTriggerFile;

pub const LLM_CLASSIFIER_DEPENDENCY_KEY: &str = "llm_classifier";
pub const ROUTING_ANALYTICS_DEPENDENCY_KEY: &str = "routing_analytics";
pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 8_000;
pub const DEFAULT_ANALYTICS_TIMEOUT_MS: u64 = 5_000;
/// Bounded window of recent turns handed to the classifier.
pub const RECENT_TURN_WINDOW: usize = 6;

const CLASSIFIER_SYSTEM_PROMPT: &str = "Classify the user's latest message into exactly one \
label: general, booking_search, or crisis. Reply with the label only.";

/// LLM collaborator that labels the current message given recent context.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        system_prompt: &str,
        recent_turns: &[ConversationTurn],
        current_message: &str,
    ) -> Result<String>;
}

/// Analytics collaborator. Fire-and-forget: calls run under their own
/// breaker and timeout, and a failure here must never alter or delay the
/// returned decision.
#[async_trait]
pub trait RoutingAnalytics: Send + Sync {
    async fn track_routing(&self, user_id: &str, decision: &RoutingDecision) -> Result<()>;
}

#[derive(Clone)]
/// Public struct `AgentRouter` used across Aria components.
pub struct AgentRouter {
    triggers: RouterTriggerFile,
    classifier: Arc<dyn IntentClassifier>,
    analytics: Option<Arc<dyn RoutingAnalytics>>,
    breakers: Arc<dyn BreakerStore>,
    breaker_policy: GuardedCallPolicy,
    classifier_timeout_ms: u64,
}

impl AgentRouter {
    pub fn new(
        triggers: RouterTriggerFile,
        classifier: Arc<dyn IntentClassifier>,
        breakers: Arc<dyn BreakerStore>,
    ) -> Self {
        Self {
            triggers,
            classifier,
            analytics: None,
            breakers,
            breaker_policy: GuardedCallPolicy::default(),
            classifier_timeout_ms: DEFAULT_CLASSIFIER_TIMEOUT_MS,
        }
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn RoutingAnalytics>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn with_classifier_timeout_ms(mut self, classifier_timeout_ms: u64) -> Self {
        self.classifier_timeout_ms = classifier_timeout_ms;
        self
    }

    /// True when the message matches a configured resume keyword. The
    /// handoff gate uses this before routing.
    pub fn is_resume_trigger(&self, message: &str) -> bool {
        self.triggers.is_resume_trigger(message)
    }

    /// True when the message asks for a human operator.
    pub fn is_handoff_trigger(&self, message: &str) -> bool {
        self.triggers.is_handoff_trigger(message)
    }

    /// Decides the handling agent for `message`. Rules are evaluated
    /// strictly in order, first match wins; the decision is reported to the
    /// analytics collaborator without awaiting it.
    pub async fn decide(
        &self,
        message: &str,
        user_id: &str,
        recent_turns: &[ConversationTurn],
        explicit_action: Option<&ExplicitAction>,
    ) -> RoutingDecision {
        let decision = self
            .evaluate_rules(message, recent_turns, explicit_action)
            .await;
        self.track_decision(user_id, &decision);
        decision
    }

    async fn evaluate_rules(
        &self,
        message: &str,
        recent_turns: &[ConversationTurn],
        explicit_action: Option<&ExplicitAction>,
    ) -> RoutingDecision {
        if let Some(ExplicitAction::BookExpert { .. }) = explicit_action {
            return RoutingDecision {
                agent: AgentKind::Booking,
                reason: RoutingReason::ExplicitAction,
                keywords_matched: Vec::new(),
                is_crisis: false,
            };
        }

        let knowledge_matches = self.triggers.matched_knowledge_triggers(message);
        if !knowledge_matches.is_empty() {
            return RoutingDecision {
                agent: AgentKind::Knowledge,
                reason: RoutingReason::KeywordMatch,
                keywords_matched: knowledge_matches,
                is_crisis: false,
            };
        }

        let crisis_matches = self.triggers.matched_crisis_triggers(message);
        if !crisis_matches.is_empty() {
            return RoutingDecision {
                agent: AgentKind::Escalation,
                reason: RoutingReason::CrisisMatch,
                keywords_matched: crisis_matches,
                is_crisis: true,
            };
        }

        self.classify_message(message, recent_turns).await
    }

    async fn classify_message(
        &self,
        message: &str,
        recent_turns: &[ConversationTurn],
    ) -> RoutingDecision {
        let window_start = recent_turns.len().saturating_sub(RECENT_TURN_WINDOW);
        let window: Vec<ConversationTurn> = recent_turns[window_start..].to_vec();
        let classifier = self.classifier.clone();
        let owned_message = message.to_string();
        let outcome = guarded_call(
            self.breakers.as_ref(),
            self.breaker_policy,
            LLM_CLASSIFIER_DEPENDENCY_KEY,
            self.classifier_timeout_ms,
            None,
            async move {
                classifier
                    .classify(CLASSIFIER_SYSTEM_PROMPT, &window, &owned_message)
                    .await
                    .map(Some)
            },
        )
        .await;

        let Some(label) = outcome.value else {
            return RoutingDecision::general_fallback();
        };
        match parse_classifier_label(&label) {
            ClassifiedIntent::Crisis => RoutingDecision {
                agent: AgentKind::Escalation,
                reason: RoutingReason::ModelClassified,
                keywords_matched: Vec::new(),
                is_crisis: true,
            },
            ClassifiedIntent::BookingSearch => RoutingDecision {
                agent: AgentKind::ExpertSearch,
                reason: RoutingReason::ModelClassified,
                keywords_matched: Vec::new(),
                is_crisis: false,
            },
            ClassifiedIntent::General => RoutingDecision::general_fallback(),
        }
    }

    fn track_decision(&self, user_id: &str, decision: &RoutingDecision) {
        let Some(analytics) = self.analytics.clone() else {
            return;
        };
        let breakers = self.breakers.clone();
        let policy = self.breaker_policy;
        let user_id = user_id.to_string();
        let decision = decision.clone();
        tokio::spawn(async move {
            guarded_call(
                breakers.as_ref(),
                policy,
                ROUTING_ANALYTICS_DEPENDENCY_KEY,
                DEFAULT_ANALYTICS_TIMEOUT_MS,
                (),
                async move { analytics.track_routing(&user_id, &decision).await },
            )
            .await;
        });
    }
}
