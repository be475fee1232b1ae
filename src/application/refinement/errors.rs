//! Errors surfaced by refinement operations.

use thiserror::Error;

use crate::domain::foundation::{ErrorCode, SessionId, ValidationError};
use crate::domain::refinement::ParseError;
use crate::ports::{RunStatus, SessionStoreError, SettingsError, TransportError};

/// Broad classification of a refinement failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something unusable; retrying unchanged will fail again.
    Validation,
    /// The assistant service failed or answered with something unusable.
    Upstream,
    /// The settings document could not be read or written.
    Configuration,
    /// A bug or an impossible state.
    Internal,
}

/// Errors returned by the refinement orchestrator.
#[derive(Debug, Error)]
pub enum RefinementError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("AI transport error: {0}")]
    Transport(TransportError),

    #[error("Assistant run ended with status {status}")]
    RunFailed {
        status: RunStatus,
        message: Option<String>,
    },

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Settings error: {0}")]
    Config(#[from] SettingsError),

    #[error("Assistant run did not finish within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RefinementError {
    /// Error code reported to callers.
    pub fn code(&self) -> ErrorCode {
        match self {
            RefinementError::Validation(e) if e.field() == "state_transition" => {
                ErrorCode::InvalidStateTransition
            }
            RefinementError::Validation(_) => ErrorCode::ValidationFailed,
            RefinementError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            RefinementError::Transport(TransportError::RateLimited { .. }) => ErrorCode::RateLimited,
            RefinementError::Transport(_) => ErrorCode::AIProviderError,
            RefinementError::RunFailed { .. } => ErrorCode::RunFailed,
            RefinementError::Parse(_) => ErrorCode::ParseFailed,
            RefinementError::Config(_) => ErrorCode::ConfigError,
            RefinementError::Timeout { .. } => ErrorCode::Timeout,
            RefinementError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Classification of the failure. Unknown sessions count as validation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RefinementError::Validation(_) | RefinementError::SessionNotFound(_) => {
                ErrorKind::Validation
            }
            RefinementError::Transport(_)
            | RefinementError::RunFailed { .. }
            | RefinementError::Parse(_)
            | RefinementError::Timeout { .. } => ErrorKind::Upstream,
            RefinementError::Config(_) => ErrorKind::Configuration,
            RefinementError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Raw assistant text, when the failure was a parse failure.
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            RefinementError::Parse(e) => Some(&e.raw),
            _ => None,
        }
    }
}

impl From<TransportError> for RefinementError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::RunFailed { status, message } => {
                RefinementError::RunFailed { status, message }
            }
            TransportError::Timeout { timeout_secs } => RefinementError::Timeout { timeout_secs },
            other => RefinementError::Transport(other),
        }
    }
}

impl From<SessionStoreError> for RefinementError {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::NotFound(id) => RefinementError::SessionNotFound(id),
            SessionStoreError::Rejected(e) => RefinementError::Validation(e),
            SessionStoreError::AlreadyExists(id) => {
                RefinementError::Internal(format!("session {} already exists", id))
            }
        }
    }
}
