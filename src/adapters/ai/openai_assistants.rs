//! OpenAI Assistants Transport - Implementation of AiTransport for the
//! OpenAI Assistants API (v2).
//!
//! Each refinement session maps to one OpenAI thread. A single assistant is
//! shared by every session in the process: it is either pinned through
//! configuration or looked up by name (and created if missing) the first
//! time a turn runs.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAiAssistantsConfig::new(api_key)
//!     .with_model("o4-mini")
//!     .with_assistant_name("story-refiner");
//!
//! let transport = OpenAiAssistantsTransport::new(config)?;
//! ```
//!
//! # Polling
//!
//! A run is polled with exponential backoff between `poll_interval` and
//! `max_poll_interval` until it reaches a terminal status or `run_timeout`
//! elapses. A timed-out run is cancelled on a best-effort basis so the
//! thread accepts new messages again.

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::{sleep, Instant};

use crate::domain::foundation::ThreadHandle;
use crate::domain::settings::ModelParams;
use crate::ports::{
    AiTransport, MessageRole, RunStatus, ThreadMessage, TransportError, TransportInfo,
};

/// Story-independent instructions for the shared assistant. Per-session
/// context travels in each thread's opening message.
const ASSISTANT_INSTRUCTIONS: &str = "You are a multi-role requirement refinement assistant \
helping a Product Manager refine user stories. Each thread starts with the product context, \
the story under refinement and the roles you play. Follow the format requested in the latest \
message exactly; when a JSON array is requested, reply with the JSON array only.";

/// Messages fetched per listing; replies are read newest first and reversed.
const MESSAGE_PAGE_SIZE: &str = "100";

/// Configuration for the OpenAI Assistants transport.
#[derive(Debug, Clone)]
pub struct OpenAiAssistantsConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model used when creating the assistant and for runs without an override.
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Maximum retries on transient failures.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub retry_base_delay: Duration,
    /// Name used to find or create the shared assistant.
    pub assistant_name: String,
    /// Skips lookup and uses this assistant directly.
    pub assistant_id: Option<String>,
    /// First delay between run status polls.
    pub poll_interval: Duration,
    /// Upper bound for the delay between polls.
    pub max_poll_interval: Duration,
    /// Deadline for a run to reach a terminal status.
    pub run_timeout: Duration,
}

impl OpenAiAssistantsConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "o4-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            assistant_name: "story-refiner".to_string(),
            assistant_id: None,
            poll_interval: Duration::from_millis(500),
            max_poll_interval: Duration::from_secs(5),
            run_timeout: Duration::from_secs(180),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_assistant_name(mut self, name: impl Into<String>) -> Self {
        self.assistant_name = name.into();
        self
    }

    /// Pins the assistant instead of resolving it by name.
    pub fn with_assistant_id(mut self, id: impl Into<String>) -> Self {
        self.assistant_id = Some(id.into());
        self
    }

    /// Sets the first and maximum delay between status polls.
    pub fn with_polling(mut self, interval: Duration, max_interval: Duration) -> Self {
        self.poll_interval = interval;
        self.max_poll_interval = max_interval.max(interval);
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI Assistants API transport.
pub struct OpenAiAssistantsTransport {
    config: OpenAiAssistantsConfig,
    client: Client,
    assistant: OnceCell<String>,
}

impl OpenAiAssistantsTransport {
    /// Creates a transport with the given configuration.
    pub fn new(config: OpenAiAssistantsConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        let assistant = match &config.assistant_id {
            Some(id) => OnceCell::new_with(Some(id.clone())),
            None => OnceCell::new(),
        };

        Ok(Self {
            config,
            client,
            assistant,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Returns the shared assistant id, resolving it on first use.
    async fn assistant_id(&self) -> Result<&str, TransportError> {
        self.assistant
            .get_or_try_init(|| self.find_or_create_assistant())
            .await
            .map(String::as_str)
    }

    async fn find_or_create_assistant(&self) -> Result<String, TransportError> {
        let listing: ListResponse<ApiAssistant> = self
            .send(Method::GET, "/assistants", None, &[("limit", "100")])
            .await?;

        if let Some(existing) = listing
            .data
            .into_iter()
            .find(|a| a.name.as_deref() == Some(self.config.assistant_name.as_str()))
        {
            tracing::info!(assistant_id = %existing.id, name = %self.config.assistant_name, "Using existing assistant");
            return Ok(existing.id);
        }

        let created: ApiAssistant = self
            .send(
                Method::POST,
                "/assistants",
                Some(json!({
                    "name": self.config.assistant_name,
                    "instructions": ASSISTANT_INSTRUCTIONS,
                    "model": self.config.model,
                })),
                &[],
            )
            .await?;

        tracing::info!(assistant_id = %created.id, name = %self.config.assistant_name, "Created assistant");
        Ok(created.id)
    }

    /// Sends a request, retrying transient failures with exponential backoff.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: &[(&str, &str)],
    ) -> Result<T, TransportError> {
        let mut retry_count = 0;

        loop {
            let result = match self.send_once(method.clone(), path, body.as_ref(), query).await {
                Ok(response) => self.parse_response(response).await,
                Err(err) => Err(err),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && retry_count < self.config.max_retries => {
                    // Exponential backoff: base, 2x base, 4x base, ...
                    let delay = self.config.retry_base_delay * (1u32 << retry_count.min(16));
                    tracing::warn!(
                        path,
                        retry = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient OpenAI failure, retrying"
                    );
                    sleep(delay).await;
                    retry_count += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> Result<Response, TransportError> {
        let mut request = self
            .client
            .request(method, self.url(path))
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("OpenAI-Beta", "assistants=v2")
            .header("Content-Type", "application/json");

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::network(format!(
                    "Request timed out after {}s",
                    self.config.timeout.as_secs()
                ))
            } else if e.is_connect() {
                TransportError::network(format!("Connection failed: {}", e))
            } else {
                TransportError::network(e.to_string())
            }
        })
    }

    async fn parse_response<T: DeserializeOwned>(&self, response: Response) -> Result<T, TransportError> {
        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_retry_after_header);
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_error_status(status.as_u16(), retry_after, &error_body));
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::parse(format!("Failed to parse response: {}", e)))
    }

    async fn cancel_run(&self, thread: &ThreadHandle, run_id: &str) {
        let path = format!("/threads/{}/runs/{}/cancel", thread, run_id);
        if let Err(e) = self
            .send_once(Method::POST, &path, None, &[])
            .await
        {
            tracing::warn!(thread = %thread, run_id, error = %e, "Failed to cancel timed-out run");
        }
    }
}

#[async_trait]
impl AiTransport for OpenAiAssistantsTransport {
    async fn create_thread(&self) -> Result<ThreadHandle, TransportError> {
        let thread: ApiObject = self
            .send(Method::POST, "/threads", Some(json!({})), &[])
            .await?;

        tracing::debug!(thread = %thread.id, "Created thread");
        ThreadHandle::new(thread.id).map_err(|e| TransportError::parse(e.to_string()))
    }

    async fn append_message(&self, thread: &ThreadHandle, text: &str) -> Result<(), TransportError> {
        let path = format!("/threads/{}/messages", thread);
        let _: ApiObject = self
            .send(
                Method::POST,
                &path,
                Some(json!({ "role": "user", "content": text })),
                &[],
            )
            .await?;

        tracing::debug!(thread = %thread, chars = text.len(), "Appended message");
        Ok(())
    }

    async fn run_turn(&self, thread: &ThreadHandle, params: &ModelParams) -> Result<(), TransportError> {
        let assistant_id = self.assistant_id().await?.to_string();
        let path = format!("/threads/{}/runs", thread);
        let request = RunRequest::new(&assistant_id, params);

        let mut run: ApiRun = self
            .send(
                Method::POST,
                &path,
                Some(serde_json::to_value(&request).map_err(|e| TransportError::parse(e.to_string()))?),
                &[],
            )
            .await?;

        tracing::debug!(thread = %thread, run_id = %run.id, status = %run.status, "Run created");

        let deadline = Instant::now() + self.config.run_timeout;
        let mut interval = self.config.poll_interval;

        while !run.status.is_terminal() {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(thread = %thread, run_id = %run.id, status = %run.status, "Run deadline exceeded");
                self.cancel_run(thread, &run.id).await;
                return Err(TransportError::Timeout {
                    timeout_secs: self.config.run_timeout.as_secs(),
                });
            }

            sleep(interval.min(deadline - now)).await;
            interval = next_poll_interval(interval, self.config.max_poll_interval);

            let run_path = format!("/threads/{}/runs/{}", thread, run.id);
            run = self.send(Method::GET, &run_path, None, &[]).await?;
        }

        if run.status == RunStatus::Completed {
            tracing::debug!(thread = %thread, run_id = %run.id, "Run completed");
            Ok(())
        } else {
            Err(TransportError::run_failed(
                run.status,
                run.last_error.map(|e| e.message),
            ))
        }
    }

    async fn latest_responses(&self, thread: &ThreadHandle) -> Result<Vec<ThreadMessage>, TransportError> {
        let path = format!("/threads/{}/messages", thread);
        let listing: ListResponse<ApiMessage> = self
            .send(
                Method::GET,
                &path,
                None,
                &[("order", "desc"), ("limit", MESSAGE_PAGE_SIZE)],
            )
            .await?;

        let mut messages: Vec<ThreadMessage> = listing
            .data
            .into_iter()
            .map(ApiMessage::into_thread_message)
            .collect();
        messages.reverse();
        Ok(messages)
    }

    fn transport_info(&self) -> TransportInfo {
        TransportInfo::new("openai-assistants", self.config.model.clone())
    }
}

/// Doubles the poll delay up to `max`.
fn next_poll_interval(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

/// Maps an unsuccessful HTTP status to a transport error. A `Retry-After`
/// header wins over any hint in the body.
fn map_error_status(status: u16, retry_after: Option<u32>, error_body: &str) -> TransportError {
    match status {
        401 | 403 => TransportError::AuthenticationFailed,
        429 => TransportError::rate_limited(retry_after.unwrap_or_else(|| parse_retry_after(error_body))),
        400 | 404 | 409 | 422 => TransportError::InvalidRequest(error_message(error_body)),
        500..=599 => {
            TransportError::unavailable(format!("Server error {}: {}", status, error_message(error_body)))
        }
        _ => TransportError::network(format!(
            "Unexpected status {}: {}",
            status,
            error_message(error_body)
        )),
    }
}

/// Extracts `error.message` from an OpenAI error body, falling back to the
/// raw body.
fn error_message(error_body: &str) -> String {
    serde_json::from_str::<Value>(error_body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| error_body.to_string())
}

/// Reads a delta-seconds `Retry-After` value, rounding fractions up.
fn parse_retry_after_header(value: &str) -> Option<u32> {
    let secs = value.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| secs.ceil() as u32)
}

/// Reads "try again in Ns" from a rate limit message; defaults to 30s.
fn parse_retry_after(error_body: &str) -> u32 {
    let message = error_message(error_body);
    message
        .find("try again in ")
        .map(|idx| &message[idx + 13..])
        .and_then(|rest| {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u32>().ok()
        })
        .unwrap_or(30)
}

// ════════════════════════════════════════════════════════════════════════════════
// Wire types
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    assistant_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

impl<'a> RunRequest<'a> {
    fn new(assistant_id: &'a str, params: &'a ModelParams) -> Self {
        Self {
            assistant_id,
            model: params.model.as_deref().filter(|m| !m.trim().is_empty()),
            temperature: params.temperature,
            max_completion_tokens: params.max_tokens.filter(|n| *n > 0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiAssistant {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRun {
    id: String,
    status: RunStatus,
    #[serde(default)]
    last_error: Option<ApiRunError>,
}

#[derive(Debug, Deserialize)]
struct ApiRunError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    role: MessageRole,
    #[serde(default)]
    content: Vec<ApiContent>,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<ApiText>,
}

#[derive(Debug, Deserialize)]
struct ApiText {
    value: String,
}

impl ApiMessage {
    /// Joins the text parts of a message; non-text parts are dropped.
    fn into_thread_message(self) -> ThreadMessage {
        let text = self
            .content
            .into_iter()
            .filter(|c| c.kind == "text")
            .filter_map(|c| c.text.map(|t| t.value))
            .collect::<Vec<_>>()
            .join("\n");
        ThreadMessage {
            role: self.role,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_works() {
        let config = OpenAiAssistantsConfig::new("test-key")
            .with_model("gpt-4o")
            .with_base_url("https://custom.api.com/v1/")
            .with_timeout(Duration::from_secs(30))
            .with_max_retries(5)
            .with_assistant_name("refiner")
            .with_polling(Duration::from_millis(200), Duration::from_secs(2))
            .with_run_timeout(Duration::from_secs(90));

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "https://custom.api.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.assistant_name, "refiner");
        assert_eq!(config.poll_interval, Duration::from_millis(200));
        assert_eq!(config.max_poll_interval, Duration::from_secs(2));
        assert_eq!(config.run_timeout, Duration::from_secs(90));
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn polling_max_never_below_initial_interval() {
        let config = OpenAiAssistantsConfig::new("k")
            .with_polling(Duration::from_secs(3), Duration::from_secs(1));
        assert_eq!(config.max_poll_interval, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn pinned_assistant_id_is_used_without_lookup() {
        let transport =
            OpenAiAssistantsTransport::new(OpenAiAssistantsConfig::new("k").with_assistant_id("asst_123"))
                .unwrap();

        assert_eq!(transport.assistant_id().await.unwrap(), "asst_123");
    }

    #[test]
    fn transport_info_reports_model() {
        let transport =
            OpenAiAssistantsTransport::new(OpenAiAssistantsConfig::new("k").with_model("o4-mini")).unwrap();
        let info = transport.transport_info();
        assert_eq!(info.name, "openai-assistants");
        assert_eq!(info.model, "o4-mini");
    }

    #[test]
    fn poll_interval_doubles_up_to_cap() {
        let max = Duration::from_secs(5);
        assert_eq!(next_poll_interval(Duration::from_millis(500), max), Duration::from_secs(1));
        assert_eq!(next_poll_interval(Duration::from_secs(4), max), max);
        assert_eq!(next_poll_interval(max, max), max);
    }

    #[test]
    fn error_statuses_map_to_transport_errors() {
        assert_eq!(map_error_status(401, None, ""), TransportError::AuthenticationFailed);
        assert!(matches!(map_error_status(404, None, "{}"), TransportError::InvalidRequest(_)));
        assert!(matches!(map_error_status(503, None, "busy"), TransportError::Unavailable { .. }));
        assert!(matches!(map_error_status(302, None, ""), TransportError::Network(_)));
    }

    #[test]
    fn rate_limit_reads_retry_hint() {
        let body = r#"{"error":{"message":"Rate limit reached. Please try again in 7s."}}"#;
        assert_eq!(map_error_status(429, None, body), TransportError::rate_limited(7));
        assert_eq!(parse_retry_after("not json"), 30);
    }

    #[test]
    fn retry_after_header_wins_over_body_hint() {
        let body = r#"{"error":{"message":"Rate limit reached. Please try again in 7s."}}"#;
        assert_eq!(map_error_status(429, Some(2), body), TransportError::rate_limited(2));
    }

    #[test]
    fn retry_after_header_values() {
        assert_eq!(parse_retry_after_header("12"), Some(12));
        assert_eq!(parse_retry_after_header(" 1.2 "), Some(2));
        assert_eq!(parse_retry_after_header("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after_header("-3"), None);
    }

    #[test]
    fn error_message_prefers_api_message() {
        let body = r#"{"error":{"message":"No thread found with id 'thread_x'."}}"#;
        assert_eq!(error_message(body), "No thread found with id 'thread_x'.");
        assert_eq!(error_message("plain"), "plain");
    }

    #[test]
    fn run_request_omits_unset_params() {
        let params = ModelParams {
            temperature: None,
            max_tokens: Some(0),
            model: Some(" ".to_string()),
        };
        let value = serde_json::to_value(RunRequest::new("asst_1", &params)).unwrap();
        assert_eq!(value, json!({ "assistant_id": "asst_1" }));

        let params = ModelParams {
            temperature: Some(0.5),
            max_tokens: Some(900),
            model: Some("gpt-4o".to_string()),
        };
        let value = serde_json::to_value(RunRequest::new("asst_1", &params)).unwrap();
        assert_eq!(value["max_completion_tokens"], 900);
        assert_eq!(value["model"], "gpt-4o");
    }

    #[test]
    fn message_text_parts_are_joined() {
        let raw = json!({
            "id": "msg_1",
            "role": "assistant",
            "content": [
                {"type": "text", "text": {"value": "first", "annotations": []}},
                {"type": "image_file", "image_file": {"file_id": "f"}},
                {"type": "text", "text": {"value": "second", "annotations": []}}
            ]
        });
        let message: ApiMessage = serde_json::from_value(raw).unwrap();
        let message = message.into_thread_message();

        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.text, "first\nsecond");
    }

    #[test]
    fn run_object_reads_status_and_error() {
        let raw = json!({
            "id": "run_1",
            "status": "failed",
            "last_error": {"code": "server_error", "message": "Something broke"}
        });
        let run: ApiRun = serde_json::from_value(raw).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.last_error.unwrap().message, "Something broke");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Run polling against a local stub server
    // ════════════════════════════════════════════════════════════════════════════

    mod polling {
        use super::*;
        use axum::extract::State;
        use axum::http::{header, StatusCode};
        use axum::response::IntoResponse;
        use axum::routing::{get, post};
        use axum::{Json, Router};
        use std::collections::VecDeque;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::{Arc, Mutex};

        /// Serves scripted run statuses; unscripted polls report `in_progress`.
        #[derive(Default)]
        struct StubApi {
            statuses: Mutex<VecDeque<&'static str>>,
            polls: AtomicUsize,
            cancels: AtomicUsize,
        }

        impl StubApi {
            fn with_statuses(statuses: &[&'static str]) -> Arc<Self> {
                Arc::new(Self {
                    statuses: Mutex::new(statuses.iter().copied().collect()),
                    ..Default::default()
                })
            }
        }

        async fn create_run() -> Json<Value> {
            Json(json!({"id": "run_1", "status": "queued"}))
        }

        async fn poll_run(State(stub): State<Arc<StubApi>>) -> Json<Value> {
            stub.polls.fetch_add(1, Ordering::SeqCst);
            let status = stub.statuses.lock().unwrap().pop_front().unwrap_or("in_progress");
            let last_error = if status == "failed" {
                json!({"code": "server_error", "message": "model overloaded"})
            } else {
                Value::Null
            };
            Json(json!({"id": "run_1", "status": status, "last_error": last_error}))
        }

        async fn cancel_run(State(stub): State<Arc<StubApi>>) -> Json<Value> {
            stub.cancels.fetch_add(1, Ordering::SeqCst);
            Json(json!({"id": "run_1", "status": "cancelling"}))
        }

        async fn rate_limited_thread() -> impl IntoResponse {
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, "2")],
                Json(json!({"error": {"message": "Rate limit reached. Please try again in 9s."}})),
            )
        }

        async fn spawn_stub(stub: Arc<StubApi>) -> String {
            let app = Router::new()
                .route("/threads", post(rate_limited_thread))
                .route("/threads/:thread/runs", post(create_run))
                .route("/threads/:thread/runs/:run", get(poll_run))
                .route("/threads/:thread/runs/:run/cancel", post(cancel_run))
                .with_state(stub);

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}", addr)
        }

        fn transport(base_url: String) -> OpenAiAssistantsTransport {
            OpenAiAssistantsTransport::new(
                OpenAiAssistantsConfig::new("test-key")
                    .with_base_url(base_url)
                    .with_assistant_id("asst_stub")
                    .with_max_retries(0)
                    .with_polling(Duration::from_millis(10), Duration::from_millis(40))
                    .with_run_timeout(Duration::from_millis(150)),
            )
            .unwrap()
        }

        fn thread() -> ThreadHandle {
            ThreadHandle::new("thread_stub").unwrap()
        }

        #[tokio::test]
        async fn run_still_active_at_deadline_times_out_and_is_cancelled() {
            let stub = StubApi::with_statuses(&[]);
            let transport = transport(spawn_stub(stub.clone()).await);

            let err = transport
                .run_turn(&thread(), &ModelParams::default())
                .await
                .unwrap_err();

            assert!(matches!(err, TransportError::Timeout { .. }));
            assert!(!err.is_retryable());
            assert_eq!(stub.cancels.load(Ordering::SeqCst), 1);
            assert!(stub.polls.load(Ordering::SeqCst) >= 2);
        }

        #[tokio::test]
        async fn failed_terminal_status_is_run_failed_without_cancel() {
            let stub = StubApi::with_statuses(&["in_progress", "failed"]);
            let transport = transport(spawn_stub(stub.clone()).await);

            let err = transport
                .run_turn(&thread(), &ModelParams::default())
                .await
                .unwrap_err();

            assert_eq!(
                err,
                TransportError::run_failed(RunStatus::Failed, Some("model overloaded".to_string()))
            );
            assert_eq!(stub.polls.load(Ordering::SeqCst), 2);
            assert_eq!(stub.cancels.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn expired_run_is_run_failed() {
            let stub = StubApi::with_statuses(&["expired"]);
            let transport = transport(spawn_stub(stub.clone()).await);

            let err = transport
                .run_turn(&thread(), &ModelParams::default())
                .await
                .unwrap_err();

            assert!(matches!(err, TransportError::RunFailed { status: RunStatus::Expired, .. }));
        }

        #[tokio::test]
        async fn completed_run_returns_after_polling() {
            let stub = StubApi::with_statuses(&["queued", "in_progress", "completed"]);
            let transport = transport(spawn_stub(stub.clone()).await);

            transport.run_turn(&thread(), &ModelParams::default()).await.unwrap();

            assert_eq!(stub.polls.load(Ordering::SeqCst), 3);
            assert_eq!(stub.cancels.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn rate_limit_uses_retry_after_header() {
            let stub = StubApi::with_statuses(&[]);
            let transport = transport(spawn_stub(stub).await);

            let err = transport.create_thread().await.unwrap_err();

            assert_eq!(err, TransportError::rate_limited(2));
        }
    }
}
