//! RefinementOrchestrator - drives refinement sessions round by round.
//!
//! Every operation follows the same shape: take the session's writer guard,
//! snapshot the session, talk to the assistant without holding any store
//! lock, then commit the new state through one atomic store update.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::{SessionId, ThreadHandle};
use crate::domain::refinement::{
    ParseError, PromptBuilder, Question, RefinementPhase, RefinementSession, ResponseParser,
    RoundArtifact, Suggestion,
};
use crate::domain::settings::{ModelParams, PromptCatalog};
use crate::ports::{latest_assistant_text, AiTransport, SessionStore, SettingsRepository};

use super::RefinementError;

/// Coordinates the session store, the assistant and the settings document.
pub struct RefinementOrchestrator {
    pub(super) store: Arc<dyn SessionStore>,
    pub(super) transport: Arc<dyn AiTransport>,
    pub(super) settings: Arc<dyn SettingsRepository>,
    pub(super) prompts: PromptBuilder,
    pub(super) parser: ResponseParser,
    writers: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl RefinementOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn AiTransport>,
        settings: Arc<dyn SettingsRepository>,
    ) -> Self {
        Self {
            store,
            transport,
            settings,
            prompts: PromptBuilder::new(),
            parser: ResponseParser::new(),
            writers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the current state of a session.
    pub async fn get(&self, session_id: SessionId) -> Result<RefinementSession, RefinementError> {
        Ok(self.store.get(session_id).await?)
    }

    /// Waits for exclusive write access to one session. Other sessions are
    /// unaffected.
    ///
    /// Unknown ids fail with `SessionNotFound` and leave no guard behind.
    pub(super) async fn lock_session(
        &self,
        session_id: SessionId,
    ) -> Result<OwnedMutexGuard<()>, RefinementError> {
        let writer = {
            let mut writers = self.writers.lock().await;
            match writers.get(&session_id) {
                Some(writer) => writer.clone(),
                None => {
                    self.store.get(session_id).await?;
                    writers.entry(session_id).or_default().clone()
                }
            }
        };
        Ok(writer.lock_owned().await)
    }

    #[cfg(test)]
    pub(super) async fn writer_count(&self) -> usize {
        self.writers.lock().await.len()
    }

    /// Appends `messages` in order, runs one turn and returns the newest
    /// assistant reply.
    pub(super) async fn converse(
        &self,
        session_id: Option<SessionId>,
        thread: &ThreadHandle,
        messages: &[String],
        params: &ModelParams,
    ) -> Result<String, RefinementError> {
        for message in messages {
            self.transport.append_message(thread, message).await?;
        }

        tracing::debug!(
            session_id = ?session_id,
            thread = %thread,
            messages = messages.len(),
            "Running assistant turn"
        );
        self.transport.run_turn(thread, params).await?;

        let replies = self.transport.latest_responses(thread).await?;
        let raw = latest_assistant_text(&replies)
            .map(str::to_string)
            .ok_or_else(|| ParseError::new("assistant produced no reply", ""))?;

        tracing::debug!(session_id = ?session_id, thread = %thread, raw = %raw, "Assistant reply");
        Ok(raw)
    }

    /// Runs a questioning or suggesting round and parses its artifact.
    pub(super) async fn generate_round(
        &self,
        session: &RefinementSession,
        phase: RefinementPhase,
        catalog: &PromptCatalog,
        supplementary_info: Option<&str>,
        mut messages: Vec<String>,
        params: &ModelParams,
    ) -> Result<RoundArtifact, RefinementError> {
        messages.push(self.prompts.phase_instruction(
            phase,
            session.selected_roles(),
            catalog,
            supplementary_info,
        ));

        let raw = self
            .converse(Some(session.id()), session.thread(), &messages, params)
            .await?;

        let artifact = match phase {
            RefinementPhase::Questioning => {
                RoundArtifact::Questions(self.parser.parse_structured::<Question>(&raw)?.items)
            }
            RefinementPhase::Suggesting => {
                RoundArtifact::Suggestions(self.parser.parse_structured::<Suggestion>(&raw)?.items)
            }
        };

        tracing::info!(
            session_id = %session.id(),
            phase = %phase,
            items = artifact.len(),
            "Round generated"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::adapters::ai::MockAiTransport;
    use crate::adapters::settings::InMemorySettingsRepository;
    use crate::adapters::storage::InMemorySessionStore;
    use crate::domain::refinement::RefinementRequest;
    use crate::domain::settings::{AppSettings, FormatExample};

    pub const TWO_QUESTIONS: &str = r#"```json
[{"role":"PM","prompt":["Who is the primary user?"]},{"role":"Designer","prompt":["Which screen hosts this?"]}]
```"#;

    pub const TWO_SUGGESTIONS: &str =
        r#"[{"role":"PM","prompt":["Limit scope to teams"]},{"role":"Designer","prompt":["Reuse the timer card"]}]"#;

    pub fn settings() -> AppSettings {
        let mut settings = AppSettings {
            product_context: "A focus timer for remote teams".to_string(),
            ..Default::default()
        };
        let prompts = &mut settings.prompts;
        prompts
            .role_prompts
            .insert("PM".to_string(), "Think about scope and value".to_string());
        prompts
            .role_prompts
            .insert("Designer".to_string(), "Think about user flows".to_string());
        prompts
            .phase_prompts
            .insert("questioning".to_string(), "Ask clarifying questions.".to_string());
        prompts
            .phase_prompts
            .insert("suggesting".to_string(), "Offer concrete suggestions.".to_string());
        prompts.phase_format_examples.insert(
            "questioning".to_string(),
            vec![FormatExample::new("PM", vec!["What is the goal?".to_string()])],
        );
        settings.model_params.temperature = Some(0.7);
        settings
    }

    pub struct Harness {
        pub orchestrator: RefinementOrchestrator,
        pub transport: MockAiTransport,
        pub store: InMemorySessionStore,
        pub settings: InMemorySettingsRepository,
    }

    pub fn harness(transport: MockAiTransport) -> Harness {
        let store = InMemorySessionStore::new();
        let settings = InMemorySettingsRepository::new(settings());
        let orchestrator = RefinementOrchestrator::new(
            Arc::new(store.clone()),
            Arc::new(transport.clone()),
            Arc::new(settings.clone()),
        );
        Harness {
            orchestrator,
            transport,
            store,
            settings,
        }
    }

    pub fn request() -> RefinementRequest {
        RefinementRequest::new(
            "As a user, I want X",
            vec!["PM".to_string(), "Designer".to_string()],
        )
    }
}
