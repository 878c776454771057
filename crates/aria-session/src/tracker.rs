use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use aria_core::{current_unix_timestamp_ms, elapsed_ms};
use aria_resilience::{guarded_call, BreakerStore, GuardedCallPolicy};

use crate::session_store::{ConversationSession, SessionStore};

pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 1_800_000;
pub const DEFAULT_CREATE_CONVERSATION_TIMEOUT_MS: u64 = 5_000;
pub const CONVERSATION_PERSISTENCE_DEPENDENCY_KEY: &str = "conversation_persistence";

/// Persistence collaborator that mints logical conversation identities.
#[async_trait]
pub trait ConversationPersistence: Send + Sync {
    async fn create_conversation(&self, user_id: &str) -> Result<String>;
}

#[derive(Clone)]
/// Public struct `SessionTracker` used across Aria components.
pub struct SessionTracker {
    store: Arc<dyn SessionStore>,
    persistence: Arc<dyn ConversationPersistence>,
    breakers: Arc<dyn BreakerStore>,
    breaker_policy: GuardedCallPolicy,
    session_timeout_ms: u64,
    create_timeout_ms: u64,
}

impl SessionTracker {
    pub fn new(
        store: Arc<dyn SessionStore>,
        persistence: Arc<dyn ConversationPersistence>,
        breakers: Arc<dyn BreakerStore>,
    ) -> Self {
        Self {
            store,
            persistence,
            breakers,
            breaker_policy: GuardedCallPolicy::default(),
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            create_timeout_ms: DEFAULT_CREATE_CONVERSATION_TIMEOUT_MS,
        }
    }

    pub fn with_session_timeout_ms(mut self, session_timeout_ms: u64) -> Self {
        self.session_timeout_ms = session_timeout_ms;
        self
    }

    pub fn with_create_timeout_ms(mut self, create_timeout_ms: u64) -> Self {
        self.create_timeout_ms = create_timeout_ms;
        self
    }

    /// Returns the live conversation id for `user_id`, refreshing its
    /// activity stamp, or installs a fresh mapping from the persistence
    /// collaborator. Returns `None` when persistence is unavailable; callers
    /// must tolerate an absent conversation identity (analytics becomes
    /// best-effort, not authoritative).
    pub async fn get_or_create_conversation(&self, user_id: &str) -> Option<String> {
        let now_unix_ms = current_unix_timestamp_ms();
        if let Some(session) = self.read_live_session(user_id, now_unix_ms) {
            self.write_session_logged(ConversationSession {
                last_activity_unix_ms: now_unix_ms,
                ..session.clone()
            });
            return Some(session.conversation_id);
        }

        let persistence = self.persistence.clone();
        let owned_user_id = user_id.to_string();
        let outcome = guarded_call(
            self.breakers.as_ref(),
            self.breaker_policy,
            CONVERSATION_PERSISTENCE_DEPENDENCY_KEY,
            self.create_timeout_ms,
            None,
            async move {
                persistence
                    .create_conversation(&owned_user_id)
                    .await
                    .map(Some)
            },
        )
        .await;

        let conversation_id = outcome.value?;
        self.write_session_logged(ConversationSession {
            user_id: user_id.to_string(),
            conversation_id: conversation_id.clone(),
            last_activity_unix_ms: now_unix_ms,
        });
        Some(conversation_id)
    }

    /// Refreshes the activity stamp of an existing live mapping without
    /// creating one. Used as a post-dispatch side effect.
    pub fn touch(&self, user_id: &str) {
        let now_unix_ms = current_unix_timestamp_ms();
        if let Some(session) = self.read_live_session(user_id, now_unix_ms) {
            self.write_session_logged(ConversationSession {
                last_activity_unix_ms: now_unix_ms,
                ..session
            });
        }
    }

    fn read_live_session(&self, user_id: &str, now_unix_ms: u64) -> Option<ConversationSession> {
        let session = match self.store.read_session(user_id) {
            Ok(session) => session?,
            Err(error) => {
                eprintln!(
                    "session read failed, treating as absent: user_id={} reason_code=session_store_error detail={}",
                    user_id, error
                );
                return None;
            }
        };
        if elapsed_ms(session.last_activity_unix_ms, now_unix_ms) < self.session_timeout_ms {
            Some(session)
        } else {
            None
        }
    }

    fn write_session_logged(&self, session: ConversationSession) {
        let user_id = session.user_id.clone();
        if let Err(error) = self.store.write_session(session) {
            eprintln!(
                "session write failed: user_id={} reason_code=session_store_error detail={}",
                user_id, error
            );
        }
    }
}
