//! Agent routing for inbound conversation messages.
//!
//! Decides which downstream agent handles a message using a fixed rule
//! priority: explicit structured action, deterministic knowledge-trigger
//! keywords, deterministic crisis-trigger keywords, then model
//! classification through a strict label allow-list. Classifier outages
//! degrade to the general agent, never to a user-visible error.

pub mod router_contract;
pub mod router_engine;
pub mod router_triggers;

pub use router_contract::{
    parse_classifier_label, parse_explicit_action, route_decision_trace_payload, AgentKind,
    ClassifiedIntent, ConversationTurn, ExplicitAction, RoutingDecision, RoutingReason,
    TurnSpeaker,
};
pub use router_engine::{
    AgentRouter, IntentClassifier, RoutingAnalytics, DEFAULT_ANALYTICS_TIMEOUT_MS,
    DEFAULT_CLASSIFIER_TIMEOUT_MS, LLM_CLASSIFIER_DEPENDENCY_KEY,
    ROUTING_ANALYTICS_DEPENDENCY_KEY, RECENT_TURN_WINDOW,
};
pub use router_triggers::{
    load_router_triggers, parse_router_triggers, RouterTriggerFile, ROUTER_TRIGGERS_FILE_NAME,
};
