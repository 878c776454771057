//! Session and conversation affinity tracking for Aria.
//!
//! Maps a user identity to a logical conversation identity with
//! inactivity-based expiry. Conversation ids come from the persistence
//! collaborator; when it is unavailable the tracker degrades to an absent
//! conversation identity and analytics becomes best-effort.

pub mod session_store;
pub mod tracker;

pub use session_store::{ConversationSession, InMemorySessionStore, SessionStore};
pub use tracker::{
    ConversationPersistence, SessionTracker, CONVERSATION_PERSISTENCE_DEPENDENCY_KEY,
    DEFAULT_CREATE_CONVERSATION_TIMEOUT_MS, DEFAULT_SESSION_TIMEOUT_MS,
};
