//! Mock AI Transport for testing.
//!
//! Keeps threads in memory and answers each turn from a queue of scripted
//! replies, so the orchestrator and HTTP layer can be exercised without
//! calling a real assistant service.
//!
//! # Features
//!
//! - Scripted replies consumed in order, one per turn
//! - Error injection for failure-path testing
//! - Recorded thread contents and run parameters for verification
//! - Simulated latency for concurrency tests
//!
//! # Example
//!
//! ```ignore
//! let transport = MockAiTransport::new()
//!     .with_reply(r#"[{"role":"PM","prompt":["Why?"]}]"#);
//!
//! let thread = transport.create_thread().await?;
//! transport.append_message(&thread, "Hello").await?;
//! transport.run_turn(&thread, &ModelParams::default()).await?;
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::foundation::ThreadHandle;
use crate::domain::settings::ModelParams;
use crate::ports::{
    AiTransport, MessageRole, RunStatus, ThreadMessage, TransportError, TransportInfo,
};

/// Reply used when the script runs out.
const DEFAULT_REPLY: &str = "[]";

/// A scripted outcome for one turn.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// The assistant answers with this text.
    Text(String),
    /// The turn fails.
    Error(MockError),
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone)]
pub enum MockError {
    RateLimited { retry_after_secs: u32 },
    Unavailable { message: String },
    AuthenticationFailed,
    Network { message: String },
    RunFailed { status: RunStatus },
    Timeout { timeout_secs: u64 },
}

impl From<MockError> for TransportError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::RateLimited { retry_after_secs } => {
                TransportError::rate_limited(retry_after_secs)
            }
            MockError::Unavailable { message } => TransportError::unavailable(message),
            MockError::AuthenticationFailed => TransportError::AuthenticationFailed,
            MockError::Network { message } => TransportError::network(message),
            MockError::RunFailed { status } => TransportError::run_failed(status, None),
            MockError::Timeout { timeout_secs } => TransportError::Timeout { timeout_secs },
        }
    }
}

/// A turn the transport was asked to run.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRun {
    pub thread: ThreadHandle,
    pub params: ModelParams,
}

/// In-memory, scriptable implementation of [`AiTransport`].
///
/// Clones share state, so a test can keep a handle while the orchestrator
/// owns another.
#[derive(Debug, Clone)]
pub struct MockAiTransport {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    threads: Arc<Mutex<HashMap<ThreadHandle, Vec<ThreadMessage>>>>,
    runs: Arc<Mutex<Vec<RecordedRun>>>,
    next_thread: Arc<AtomicU64>,
    delay: Duration,
    info: TransportInfo,
}

impl Default for MockAiTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAiTransport {
    /// Creates a mock transport with an empty script.
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            threads: Arc::new(Mutex::new(HashMap::new())),
            runs: Arc::new(Mutex::new(Vec::new())),
            next_thread: Arc::new(AtomicU64::new(1)),
            delay: Duration::ZERO,
            info: TransportInfo::new("mock", "mock-assistant"),
        }
    }

    /// Queues a successful reply.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push_reply(text);
        self
    }

    /// Queues a failing turn.
    pub fn with_error(self, error: MockError) -> Self {
        self.push_error(error);
        self
    }

    /// Sets simulated latency per turn.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queues a successful reply on a shared handle.
    pub fn push_reply(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(MockReply::Text(text.into()));
    }

    /// Queues a failing turn on a shared handle.
    pub fn push_error(&self, error: MockError) {
        self.replies
            .lock()
            .unwrap()
            .push_back(MockReply::Error(error));
    }

    /// Number of threads created so far.
    pub fn thread_count(&self) -> usize {
        self.threads.lock().unwrap().len()
    }

    /// Every message on a thread, oldest first.
    pub fn messages(&self, thread: &ThreadHandle) -> Vec<ThreadMessage> {
        self.threads
            .lock()
            .unwrap()
            .get(thread)
            .cloned()
            .unwrap_or_default()
    }

    /// Texts the orchestrator appended to a thread, oldest first.
    pub fn user_messages(&self, thread: &ThreadHandle) -> Vec<String> {
        self.messages(thread)
            .into_iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.text)
            .collect()
    }

    /// All turns run so far.
    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().unwrap().clone()
    }

    /// Number of turns run so far.
    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    fn next_reply(&self) -> MockReply {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockReply::Text(DEFAULT_REPLY.to_string()))
    }

    fn push_message(&self, thread: &ThreadHandle, message: ThreadMessage) -> Result<(), TransportError> {
        let mut threads = self.threads.lock().unwrap();
        let messages = threads.get_mut(thread).ok_or_else(|| {
            TransportError::InvalidRequest(format!("No such thread: {}", thread))
        })?;
        messages.push(message);
        Ok(())
    }
}

#[async_trait]
impl AiTransport for MockAiTransport {
    async fn create_thread(&self) -> Result<ThreadHandle, TransportError> {
        let n = self.next_thread.fetch_add(1, Ordering::SeqCst);
        let handle = ThreadHandle::new(format!("thread_mock_{}", n))
            .map_err(|e| TransportError::parse(e.to_string()))?;
        self.threads
            .lock()
            .unwrap()
            .insert(handle.clone(), Vec::new());
        Ok(handle)
    }

    async fn append_message(&self, thread: &ThreadHandle, text: &str) -> Result<(), TransportError> {
        self.push_message(thread, ThreadMessage::user(text))
    }

    async fn run_turn(&self, thread: &ThreadHandle, params: &ModelParams) -> Result<(), TransportError> {
        self.runs.lock().unwrap().push(RecordedRun {
            thread: thread.clone(),
            params: params.clone(),
        });

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match self.next_reply() {
            MockReply::Text(text) => self.push_message(thread, ThreadMessage::assistant(text)),
            MockReply::Error(err) => Err(err.into()),
        }
    }

    async fn latest_responses(&self, thread: &ThreadHandle) -> Result<Vec<ThreadMessage>, TransportError> {
        self.threads
            .lock()
            .unwrap()
            .get(thread)
            .cloned()
            .ok_or_else(|| TransportError::InvalidRequest(format!("No such thread: {}", thread)))
    }

    fn transport_info(&self) -> TransportInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::latest_assistant_text;

    #[tokio::test]
    async fn replies_are_consumed_in_order() {
        let transport = MockAiTransport::new().with_reply("first").with_reply("second");
        let thread = transport.create_thread().await.unwrap();

        transport.run_turn(&thread, &ModelParams::default()).await.unwrap();
        transport.run_turn(&thread, &ModelParams::default()).await.unwrap();

        let messages = transport.latest_responses(&thread).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(latest_assistant_text(&messages), Some("second"));
    }

    #[tokio::test]
    async fn exhausted_script_answers_with_empty_array() {
        let transport = MockAiTransport::new();
        let thread = transport.create_thread().await.unwrap();

        transport.run_turn(&thread, &ModelParams::default()).await.unwrap();

        let messages = transport.latest_responses(&thread).await.unwrap();
        assert_eq!(latest_assistant_text(&messages), Some(DEFAULT_REPLY));
    }

    #[tokio::test]
    async fn injected_errors_surface_as_transport_errors() {
        let transport = MockAiTransport::new().with_error(MockError::RunFailed {
            status: RunStatus::Failed,
        });
        let thread = transport.create_thread().await.unwrap();

        let err = transport
            .run_turn(&thread, &ModelParams::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransportError::RunFailed {
                status: RunStatus::Failed,
                ..
            }
        ));
        assert_eq!(transport.run_count(), 1);
    }

    #[tokio::test]
    async fn threads_are_isolated() {
        let transport = MockAiTransport::new();
        let a = transport.create_thread().await.unwrap();
        let b = transport.create_thread().await.unwrap();

        transport.append_message(&a, "to a").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(transport.user_messages(&a), vec!["to a".to_string()]);
        assert!(transport.user_messages(&b).is_empty());
        assert_eq!(transport.thread_count(), 2);
    }

    #[tokio::test]
    async fn unknown_thread_is_rejected() {
        let transport = MockAiTransport::new();
        let ghost = ThreadHandle::new("thread_ghost").unwrap();

        let err = transport.append_message(&ghost, "hello").await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn run_parameters_are_recorded() {
        let transport = MockAiTransport::new();
        let thread = transport.create_thread().await.unwrap();
        let params = ModelParams {
            temperature: Some(0.3),
            max_tokens: Some(500),
            model: None,
        };

        transport.run_turn(&thread, &params).await.unwrap();

        let runs = transport.runs();
        assert_eq!(runs[0].thread, thread);
        assert_eq!(runs[0].params, params);
    }

    #[tokio::test]
    async fn clones_share_script_and_threads() {
        let transport = MockAiTransport::new();
        let handle = transport.clone();
        handle.push_reply("shared");

        let thread = transport.create_thread().await.unwrap();
        transport.run_turn(&thread, &ModelParams::default()).await.unwrap();

        let messages = handle.messages(&thread);
        assert_eq!(latest_assistant_text(&messages), Some("shared"));
    }
}
