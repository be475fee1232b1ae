//! AI Transport Port - Interface for thread-based assistant services.
//!
//! A transport keeps one persistent conversation thread per refinement
//! session. The orchestrator appends user messages to the thread, asks the
//! assistant to take a turn, and reads the replies back.
//!
//! # Example
//!
//! ```ignore
//! let thread = transport.create_thread().await?;
//! transport.append_message(&thread, "Hello").await?;
//! transport.run_turn(&thread, &ModelParams::default()).await?;
//! let replies = transport.latest_responses(&thread).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ThreadHandle;
use crate::domain::settings::ModelParams;

/// Port for assistant conversations held in remote threads.
#[async_trait]
pub trait AiTransport: Send + Sync {
    /// Opens a new, empty conversation thread.
    async fn create_thread(&self) -> Result<ThreadHandle, TransportError>;

    /// Appends a user message to the thread.
    async fn append_message(&self, thread: &ThreadHandle, text: &str) -> Result<(), TransportError>;

    /// Runs one assistant turn and waits until it reaches a terminal status.
    ///
    /// # Errors
    ///
    /// - `RunFailed` if the run ends in any status other than completed
    /// - `Timeout` if the run is still active when the run deadline passes
    async fn run_turn(&self, thread: &ThreadHandle, params: &ModelParams) -> Result<(), TransportError>;

    /// Messages on the thread, oldest first.
    async fn latest_responses(&self, thread: &ThreadHandle) -> Result<Vec<ThreadMessage>, TransportError>;

    /// Name and default model of the transport, for logs.
    fn transport_info(&self) -> TransportInfo;
}

/// Author of a thread message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One text message read back from a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub role: MessageRole,
    pub text: String,
}

impl ThreadMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

/// Returns the newest assistant reply in an oldest-first message list.
pub fn latest_assistant_text(messages: &[ThreadMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant)
        .map(|m| m.text.as_str())
}

/// Transport name and model, reported in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportInfo {
    pub name: String,
    pub model: String,
}

impl TransportInfo {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

/// Lifecycle status of an assistant run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Returns true once the run will not change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Cancelled
                | RunStatus::Failed
                | RunStatus::Completed
                | RunStatus::Incomplete
                | RunStatus::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from AI transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    /// Provider returned a server error or is overloaded.
    #[error("provider unavailable: {message}")]
    Unavailable { message: String },

    /// API key rejected.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Connection, DNS or request timeout failure.
    #[error("network error: {0}")]
    Network(String),

    /// Provider answered with a body we could not read.
    #[error("parse error: {0}")]
    Parse(String),

    /// Provider rejected the request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The run ended in a non-completed terminal status.
    #[error("assistant run ended with status {status}{}", detail_suffix(.message))]
    RunFailed {
        status: RunStatus,
        message: Option<String>,
    },

    /// The run deadline passed before the run finished.
    #[error("assistant run did not finish within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

fn detail_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

impl TransportError {
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn run_failed(status: RunStatus, message: Option<String>) -> Self {
        Self::RunFailed { status, message }
    }

    /// Returns true for failures worth retrying the same HTTP call for.
    ///
    /// A failed run is never retried; the thread already holds its outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::RateLimited { .. }
                | TransportError::Unavailable { .. }
                | TransportError::Network(_)
        )
    }
}
