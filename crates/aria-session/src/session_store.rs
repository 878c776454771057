use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `ConversationSession` used across Aria components.
pub struct ConversationSession {
    pub user_id: String,
    pub conversation_id: String,
    pub last_activity_unix_ms: u64,
}

/// User-to-conversation affinity bookkeeping.
///
/// Expired mappings are superseded by a later write, never deleted in place.
/// The in-memory implementation covers single-instance deployments; a shared
/// key-value store can back this trait for multi-instance deployments.
pub trait SessionStore: Send + Sync {
    fn read_session(&self, user_id: &str) -> Result<Option<ConversationSession>>;
    fn write_session(&self, session: ConversationSession) -> Result<()>;
}

#[derive(Debug, Default)]
/// Public struct `InMemorySessionStore` used across Aria components.
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, ConversationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn read_session(&self, user_id: &str) -> Result<Option<ConversationSession>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow!("session store lock is poisoned"))?;
        Ok(sessions.get(user_id).cloned())
    }

    fn write_session(&self, session: ConversationSession) -> Result<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow!("session store lock is poisoned"))?;
        sessions.insert(session.user_id.clone(), session);
        Ok(())
    }
}
