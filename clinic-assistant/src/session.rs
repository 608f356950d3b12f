//! Conversation sessions with idle expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clinic_booking::BookingSession;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::config::DEFAULT_SESSION_TTL;

pub type SessionId = String;

/// Number of chat messages kept per conversation.
pub const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Everything remembered about one conversation.
#[derive(Debug, Default)]
pub struct ConversationSession {
    pub booking: BookingSession,
    history: Vec<ChatMessage>,
}

impl ConversationSession {
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Appends to the history, dropping the oldest messages past
    /// [`MAX_HISTORY`].
    pub fn push(&mut self, message: ChatMessage) {
        self.history.push(message);
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }
}

#[derive(Debug)]
struct SessionEntry {
    session: Arc<Mutex<ConversationSession>>,
    last_seen: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self { session: Arc::new(Mutex::new(ConversationSession::default())), last_seen: Instant::now() }
    }
}

/// Owns all live conversations.
///
/// Each conversation is behind its own mutex, so turns for one conversation
/// run one at a time while different conversations proceed independently.
/// Conversations idle for longer than the TTL are evicted whenever the store
/// is accessed.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts a conversation and returns its id.
    pub async fn create(&self) -> SessionId {
        let session_id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        evict(&mut sessions, self.ttl);
        sessions.insert(session_id.clone(), SessionEntry::new());
        debug!(session_id = %session_id, "Created conversation session");
        session_id
    }

    /// Returns the conversation for `session_id`, creating it when it does
    /// not exist or has expired, and marks it as active.
    pub async fn get_or_create(&self, session_id: &str) -> Arc<Mutex<ConversationSession>> {
        let mut sessions = self.sessions.write().await;
        evict(&mut sessions, self.ttl);
        let entry = sessions.entry(session_id.to_string()).or_insert_with(SessionEntry::new);
        entry.last_seen = Instant::now();
        entry.session.clone()
    }

    /// Returns the conversation for `session_id` if it is still live.
    pub async fn get(&self, session_id: &str) -> Option<Arc<Mutex<ConversationSession>>> {
        let mut sessions = self.sessions.write().await;
        evict(&mut sessions, self.ttl);
        let entry = sessions.get_mut(session_id)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    pub async fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    /// Drops idle conversations and returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        evict(&mut *self.sessions.write().await, self.ttl)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn evict(sessions: &mut HashMap<SessionId, SessionEntry>, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, entry| entry.last_seen.elapsed() <= ttl);
    let evicted = before - sessions.len();
    if evicted > 0 {
        debug!(evicted, "Evicted idle conversation sessions");
    }
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_bounded() {
        let mut session = ConversationSession::default();
        for i in 0..(MAX_HISTORY + 5) {
            session.push(ChatMessage::user(format!("message {i}")));
        }
        assert_eq!(session.history().len(), MAX_HISTORY);
        assert_eq!(session.history()[0].content, "message 5");
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_expire() {
        let store = SessionStore::new(Duration::from_secs(60));
        let idle = store.create().await;
        let busy = store.create().await;

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(store.get(&busy).await.is_some());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.evict_expired().await, 1);
        assert!(store.get(&idle).await.is_none());
        assert!(store.get(&busy).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_restarts_empty() {
        let store = SessionStore::new(Duration::from_secs(10));
        let id = store.create().await;
        store.get_or_create(&id).await.lock().await.push(ChatMessage::user("hello"));

        tokio::time::advance(Duration::from_secs(11)).await;
        let session = store.get_or_create(&id).await;
        assert!(session.lock().await.history().is_empty());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn created_ids_are_unique() {
        let store = SessionStore::default();
        let a = store.create().await;
        let b = store.create().await;
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
        assert!(store.remove(&a).await);
        assert!(!store.remove(&a).await);
    }
}
