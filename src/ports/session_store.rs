//! Session Store Port - Keyed storage for active refinement sessions.
//!
//! Stores only hold sessions for the lifetime of the process. Updates are
//! atomic read-modify-write operations on a single session: the mutator runs
//! while the store holds its write lock, so it must be pure state mutation
//! and never await anything slow.

use async_trait::async_trait;

use crate::domain::foundation::{SessionId, ValidationError};
use crate::domain::refinement::RefinementSession;

/// Mutation applied to a stored session. Returning an error leaves the
/// stored session unchanged.
pub type SessionMutator =
    Box<dyn FnOnce(&mut RefinementSession) -> Result<(), ValidationError> + Send>;

/// Errors that can occur during session store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session already exists: {0}")]
    AlreadyExists(SessionId),

    #[error("Session update rejected: {0}")]
    Rejected(#[from] ValidationError),
}

/// Port for storing refinement sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a new session and returns its id.
    async fn create(&self, session: RefinementSession) -> Result<SessionId, SessionStoreError>;

    /// Returns a snapshot of the session.
    async fn get(&self, id: SessionId) -> Result<RefinementSession, SessionStoreError>;

    /// Applies `mutator` atomically and returns the updated session.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no session has this id
    /// - `Rejected` if the mutator refused the change
    async fn update(
        &self,
        id: SessionId,
        mutator: SessionMutator,
    ) -> Result<RefinementSession, SessionStoreError>;

    /// Number of stored sessions.
    async fn len(&self) -> usize;

    /// Returns true when no sessions are stored.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
