//! Submitting answers to the current questions.

use crate::domain::refinement::{RefinementPhase, RefinementSession};

use super::{RefinementError, RefinementOrchestrator, SubmitAnswersCommand};

impl RefinementOrchestrator {
    /// Records the PM's answers and asks the roles for a fresh set of
    /// questions.
    pub async fn submit_answers_and_continue(
        &self,
        cmd: SubmitAnswersCommand,
    ) -> Result<RefinementSession, RefinementError> {
        self.submit_answers(cmd, RefinementPhase::Questioning, "submit_answers_and_continue")
            .await
    }

    /// Records the PM's answers and moves the session to suggesting.
    pub async fn submit_answers_and_get_suggestions(
        &self,
        cmd: SubmitAnswersCommand,
    ) -> Result<RefinementSession, RefinementError> {
        self.submit_answers(cmd, RefinementPhase::Suggesting, "submit_answers_and_get_suggestions")
            .await
    }

    async fn submit_answers(
        &self,
        cmd: SubmitAnswersCommand,
        target: RefinementPhase,
        operation: &'static str,
    ) -> Result<RefinementSession, RefinementError> {
        let _writer = self.lock_session(cmd.session_id).await?;

        let session = self.store.get(cmd.session_id).await?;
        session.ensure_phase(RefinementPhase::Questioning, operation)?;

        let settings = self.settings.load().await?;
        let params = session.request().model_params.or(&settings.model_params);

        let answered = session.match_answers(&cmd.answers);
        let preamble: Vec<String> = self.prompts.answers_message(&answered).into_iter().collect();

        tracing::info!(
            session_id = %session.id(),
            answered = answered.len(),
            target = %target,
            "Submitting answers"
        );

        let artifact = self
            .generate_round(
                &session,
                target,
                &settings.prompts,
                cmd.additional_info.as_deref(),
                preamble,
                &params,
            )
            .await?;

        let catalog = settings.prompts;
        let info = cmd.additional_info;
        let updated = self
            .store
            .update(
                cmd.session_id,
                Box::new(move |s: &mut RefinementSession| {
                    s.record_answers(&answered);
                    s.set_supplementary_info(info);
                    s.refresh_prompts(catalog);
                    s.enter_round(artifact)
                }),
            )
            .await?;

        Ok(updated)
    }
}
