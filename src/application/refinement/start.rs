//! Opening a refinement session.

use crate::domain::foundation::SessionId;
use crate::domain::refinement::{Question, RefinementRequest, RefinementSession};

use super::{RefinementError, RefinementOrchestrator};

impl RefinementOrchestrator {
    /// Opens a session: creates a thread, asks the selected roles for their
    /// first questions and stores the session in the questioning phase.
    ///
    /// Nothing is stored when validation, the assistant or parsing fails.
    pub async fn start(&self, request: RefinementRequest) -> Result<RefinementSession, RefinementError> {
        request.validate()?;

        let settings = self.settings.load().await?;
        let params = request.model_params.or(&settings.model_params);

        let thread = self.transport.create_thread().await?;
        tracing::info!(
            thread = %thread,
            roles = ?request.selected_roles,
            transport = %self.transport.transport_info().name,
            "Starting refinement session"
        );

        let opening = self
            .prompts
            .opening_instruction(&settings.product_context, &request, &settings.prompts);
        let raw = self.converse(None, &thread, &[opening], &params).await?;
        let questions = self.parser.parse_structured::<Question>(&raw)?.items;

        let session = RefinementSession::new(
            SessionId::new(),
            thread,
            request,
            settings.prompts,
            questions,
        );
        let session_id = self.store.create(session.clone()).await?;

        tracing::info!(
            session_id = %session_id,
            questions = session.questions().len(),
            "Refinement session started"
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::super::orchestrator::test_support::*;
    use super::*;
    use crate::adapters::ai::{MockAiTransport, MockError};
    use crate::domain::refinement::RefinementPhase;
    use crate::ports::{RunStatus, SessionStore};

    #[tokio::test]
    async fn start_yields_questioning_session_with_parsed_questions() {
        let h = harness(MockAiTransport::new().with_reply(TWO_QUESTIONS));

        let session = h.orchestrator.start(request()).await.unwrap();

        assert_eq!(session.phase(), RefinementPhase::Questioning);
        assert_eq!(session.questions().len(), 2);
        assert!(session.suggestions().is_empty());
        assert_eq!(h.store.get(session.id()).await.unwrap(), session);
    }

    #[tokio::test]
    async fn opening_message_carries_context_and_roles() {
        let h = harness(MockAiTransport::new().with_reply(TWO_QUESTIONS));

        let session = h.orchestrator.start(request()).await.unwrap();

        let sent = h.transport.user_messages(session.thread());
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("A focus timer for remote teams"));
        assert!(sent[0].contains("As a user, I want X"));
        assert!(sent[0].contains("- PM: Think about scope and value"));
        assert!(sent[0].contains("- Designer: Think about user flows"));
    }

    #[tokio::test]
    async fn empty_roles_fail_without_creating_anything() {
        let h = harness(MockAiTransport::new().with_reply(TWO_QUESTIONS));
        let mut req = request();
        req.selected_roles.clear();

        let err = h.orchestrator.start(req).await.unwrap_err();

        assert!(matches!(err, RefinementError::Validation(_)));
        assert_eq!(h.store.len().await, 0);
        assert_eq!(h.transport.thread_count(), 0);
    }

    #[tokio::test]
    async fn blank_story_is_rejected() {
        let h = harness(MockAiTransport::new());
        let mut req = request();
        req.initial_user_story = "  \n ".to_string();

        let err = h.orchestrator.start(req).await.unwrap_err();
        assert!(matches!(err, RefinementError::Validation(_)));
    }

    #[tokio::test]
    async fn unparseable_reply_stores_nothing_and_keeps_raw() {
        let h = harness(MockAiTransport::new().with_reply("Happy to help! What is the goal?"));

        let err = h.orchestrator.start(request()).await.unwrap_err();

        assert_eq!(err.raw_reply(), Some("Happy to help! What is the goal?"));
        assert_eq!(h.store.len().await, 0);
    }

    #[tokio::test]
    async fn failed_run_is_reported_as_run_failed() {
        let h = harness(MockAiTransport::new().with_error(MockError::RunFailed {
            status: RunStatus::Expired,
        }));

        let err = h.orchestrator.start(request()).await.unwrap_err();

        assert!(matches!(err, RefinementError::RunFailed { status: RunStatus::Expired, .. }));
        assert_eq!(h.store.len().await, 0);
    }

    #[tokio::test]
    async fn settings_model_params_fill_request_gaps() {
        let h = harness(MockAiTransport::new().with_reply(TWO_QUESTIONS));
        let mut req = request();
        req.model_params.max_tokens = Some(256);

        h.orchestrator.start(req).await.unwrap();

        let run = &h.transport.runs()[0];
        assert_eq!(run.params.max_tokens, Some(256));
        assert_eq!(run.params.temperature, Some(0.7));
    }
}
