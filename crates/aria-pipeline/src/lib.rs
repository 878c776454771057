//! End-to-end decision flow for inbound conversation events.
//!
//! Wires deduplication, the handoff gate, agent routing, dispatch, and
//! session affinity into one pass per event: duplicates are dropped, a
//! human-controlled conversation holds the message for the operator unless
//! the user asks to resume, and everything else is routed and dispatched to
//! the agent-execution collaborator.

pub mod pipeline_contract;
pub mod pipeline_runtime;

pub use pipeline_contract::{
    AgentExecutor, HeldMessageSink, InboundEvent, PipelineEventOutcome, PipelineRunSummary,
};
pub use pipeline_runtime::ConversationPipeline;
