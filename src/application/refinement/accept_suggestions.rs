//! Accepting suggestions and continuing the conversation.

use crate::domain::refinement::{RefinementPhase, RefinementSession};

use super::{AcceptSuggestionsCommand, AcceptSuggestionsResult, RefinementError, RefinementOrchestrator};

impl RefinementOrchestrator {
    /// Tells the assistant which suggestions were accepted and runs the next
    /// round in `cmd.next_phase`.
    ///
    /// An empty accepted list is sent as an explicit "none accepted" message.
    pub async fn accept_suggestions(
        &self,
        cmd: AcceptSuggestionsCommand,
    ) -> Result<AcceptSuggestionsResult, RefinementError> {
        let _writer = self.lock_session(cmd.session_id).await?;

        let session = self.store.get(cmd.session_id).await?;
        session.ensure_phase(RefinementPhase::Suggesting, "accept_suggestions")?;

        let settings = self.settings.load().await?;
        let params = session.request().model_params.or(&settings.model_params);

        tracing::info!(
            session_id = %session.id(),
            accepted = cmd.accepted.len(),
            next_phase = %cmd.next_phase,
            "Accepting suggestions"
        );

        let preamble = vec![self.prompts.accepted_suggestions_message(&cmd.accepted)];
        let artifact = self
            .generate_round(
                &session,
                cmd.next_phase,
                &settings.prompts,
                cmd.additional_info.as_deref(),
                preamble,
                &params,
            )
            .await?;

        let accepted = cmd.accepted.clone();
        let catalog = settings.prompts;
        let info = cmd.additional_info;
        let session = self
            .store
            .update(
                cmd.session_id,
                Box::new(move |s: &mut RefinementSession| {
                    s.record_accepted(&accepted);
                    s.set_supplementary_info(info);
                    s.refresh_prompts(catalog);
                    s.enter_round(artifact)
                }),
            )
            .await?;

        Ok(AcceptSuggestionsResult {
            session,
            previous_accepted: cmd.accepted,
        })
    }
}
