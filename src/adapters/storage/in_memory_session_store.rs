//! In-Memory Session Store Adapter
//!
//! Keeps refinement sessions in a process-wide map guarded by a
//! reader/writer lock. Sessions live until the process exits.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::SessionId;
use crate::domain::refinement::RefinementSession;
use crate::ports::{SessionMutator, SessionStore, SessionStoreError};

/// In-memory storage for refinement sessions
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, RefinementSession>>>,
}

impl InMemorySessionStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all stored sessions (useful for tests)
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: RefinementSession) -> Result<SessionId, SessionStoreError> {
        let id = session.id();
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return Err(SessionStoreError::AlreadyExists(id));
        }
        sessions.insert(id, session);
        Ok(id)
    }

    async fn get(&self, id: SessionId) -> Result<RefinementSession, SessionStoreError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .cloned()
            .ok_or(SessionStoreError::NotFound(id))
    }

    async fn update(
        &self,
        id: SessionId,
        mutator: SessionMutator,
    ) -> Result<RefinementSession, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .get_mut(&id)
            .ok_or(SessionStoreError::NotFound(id))?;

        // Mutate a copy so a rejected change leaves the stored session intact.
        let mut working = stored.clone();
        mutator(&mut working)?;
        *stored = working.clone();
        Ok(working)
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
