//! Producing a finalized user story.

use crate::domain::refinement::{FinalizeResult, ParseError, RefinementPhase, RefinementSession};

use super::{FinalizeCommand, RefinementError, RefinementOrchestrator};

impl RefinementOrchestrator {
    /// Asks the assistant for the rewritten story and its acceptance
    /// criteria.
    ///
    /// Pending answers or suggestion picks are folded into the thread first.
    /// The session keeps its phase and round artifacts, so finalize may be
    /// called repeatedly.
    pub async fn finalize(&self, cmd: FinalizeCommand) -> Result<FinalizeResult, RefinementError> {
        let _writer = self.lock_session(cmd.session_id).await?;

        let session = self.store.get(cmd.session_id).await?;
        let settings = self.settings.load().await?;
        let params = session.request().model_params.or(&settings.model_params);
        let phase = cmd.current_phase.unwrap_or_else(|| session.phase());

        let mut messages = Vec::new();
        match phase {
            RefinementPhase::Questioning => {
                let answered = session.match_answers(&cmd.current_answers);
                messages.extend(self.prompts.answers_message(&answered));
            }
            RefinementPhase::Suggesting => {
                let picked = session.suggestions_matching(&cmd.current_suggestion_keys);
                if !picked.is_empty() {
                    messages.push(self.prompts.accepted_suggestions_message(&picked));
                }
            }
        }
        if let Some(note) = cmd.modification_note.as_deref() {
            messages.extend(self.prompts.modification_note_message(note));
        }
        messages.push(self.prompts.finalize_instruction());

        tracing::info!(
            session_id = %session.id(),
            phase = %phase,
            messages = messages.len(),
            "Finalizing user story"
        );

        let raw = self
            .converse(Some(session.id()), session.thread(), &messages, &params)
            .await?;
        if raw.trim().is_empty() {
            return Err(ParseError::new("assistant returned an empty story", raw).into());
        }

        let draft = self.parser.parse_sections(&raw);
        let stored = draft.clone();
        let note = cmd.modification_note;
        self.store
            .update(
                cmd.session_id,
                Box::new(move |s: &mut RefinementSession| {
                    s.record_draft(stored, note);
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            session_id = %session.id(),
            criteria = draft.acceptance_criteria.len(),
            "User story finalized"
        );
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::super::orchestrator::test_support::*;
    use super::super::SubmitAnswersCommand;
    use super::*;
    use crate::adapters::ai::MockAiTransport;
    use crate::domain::refinement::{prompt_key, CRITERIA_MARKER, STORY_MARKER};
    use std::collections::HashMap;

    fn final_reply() -> String {
        format!(
            "{}\nAs a team lead, I want a shared focus timer so that meetings stay short.\n\n{}\n1. Timer starts for all members\n2. Timer can be paused\n3. Sessions are logged\n4. Members get a notification\n5. Works offline\n",
            STORY_MARKER, CRITERIA_MARKER
        )
    }

    #[tokio::test]
    async fn finalize_parses_story_and_leaves_round_state_alone() {
        let h = harness(MockAiTransport::new().with_reply(TWO_QUESTIONS).with_reply(final_reply()));
        let session = h.orchestrator.start(request()).await.unwrap();

        let result = h.orchestrator.finalize(FinalizeCommand::new(session.id())).await.unwrap();

        assert!(result.user_story.starts_with("As a team lead"));
        assert_eq!(result.acceptance_criteria.len(), 5);
        assert_eq!(result.raw, final_reply());

        let stored = h.orchestrator.get(session.id()).await.unwrap();
        assert_eq!(stored.phase(), RefinementPhase::Questioning);
        assert_eq!(stored.questions(), session.questions());
        assert_eq!(stored.user_story(), result.user_story);
        assert_eq!(stored.latest_draft(), Some(&result));
    }

    #[tokio::test]
    async fn pending_answers_are_sent_before_the_finalize_instruction() {
        let h = harness(MockAiTransport::new().with_reply(TWO_QUESTIONS).with_reply(final_reply()));
        let session = h.orchestrator.start(request()).await.unwrap();

        let mut cmd = FinalizeCommand::new(session.id());
        cmd.current_answers = HashMap::from([(
            prompt_key("PM", "Who is the primary user?"),
            "Team leads".to_string(),
        )]);
        cmd.modification_note = Some("Mention offline support".to_string());
        h.orchestrator.finalize(cmd).await.unwrap();

        let sent = h.transport.user_messages(session.thread());
        assert_eq!(sent.len(), 4);
        assert!(sent[1].starts_with("PM answer to PM's question"));
        assert_eq!(sent[2], "[Modification request]\nMention offline support");
        assert!(sent[3].contains(STORY_MARKER));
    }

    #[tokio::test]
    async fn picked_suggestions_are_sent_when_suggesting() {
        let h = harness(
            MockAiTransport::new()
                .with_reply(TWO_QUESTIONS)
                .with_reply(TWO_SUGGESTIONS)
                .with_reply(final_reply()),
        );
        let session = h.orchestrator.start(request()).await.unwrap();
        h.orchestrator
            .submit_answers_and_get_suggestions(SubmitAnswersCommand {
                session_id: session.id(),
                answers: HashMap::new(),
                additional_info: None,
            })
            .await
            .unwrap();

        let mut cmd = FinalizeCommand::new(session.id());
        cmd.current_suggestion_keys = vec![prompt_key("Designer", "Reuse the timer card")];
        h.orchestrator.finalize(cmd).await.unwrap();

        let sent = h.transport.user_messages(session.thread());
        let accepted = &sent[sent.len() - 2];
        assert!(accepted.contains("- Designer: Reuse the timer card"));
        assert!(!accepted.contains("Limit scope to teams"));
    }

    #[tokio::test]
    async fn unstructured_reply_becomes_the_story() {
        let h = harness(
            MockAiTransport::new()
                .with_reply(TWO_QUESTIONS)
                .with_reply("  Just a plain improved story.  "),
        );
        let session = h.orchestrator.start(request()).await.unwrap();

        let result = h.orchestrator.finalize(FinalizeCommand::new(session.id())).await.unwrap();

        assert_eq!(result.user_story, "  Just a plain improved story.  ");
        assert_eq!(result.user_story, result.raw);
        assert!(result.acceptance_criteria.is_empty());
    }

    #[tokio::test]
    async fn empty_reply_is_a_parse_failure() {
        let h = harness(MockAiTransport::new().with_reply(TWO_QUESTIONS).with_reply("   "));
        let session = h.orchestrator.start(request()).await.unwrap();

        let err = h.orchestrator.finalize(FinalizeCommand::new(session.id())).await.unwrap_err();

        assert!(matches!(err, RefinementError::Parse(_)));
        let stored = h.orchestrator.get(session.id()).await.unwrap();
        assert!(stored.latest_draft().is_none());
    }

    #[tokio::test]
    async fn finalize_can_be_repeated_on_the_same_thread() {
        let h = harness(
            MockAiTransport::new()
                .with_reply(TWO_QUESTIONS)
                .with_reply(final_reply())
                .with_reply(final_reply()),
        );
        let session = h.orchestrator.start(request()).await.unwrap();

        h.orchestrator.finalize(FinalizeCommand::new(session.id())).await.unwrap();
        h.orchestrator.finalize(FinalizeCommand::new(session.id())).await.unwrap();

        assert_eq!(h.transport.thread_count(), 1);
        assert_eq!(h.transport.run_count(), 3);
        assert!(h
            .transport
            .runs()
            .iter()
            .all(|run| &run.thread == session.thread()));
    }
}
