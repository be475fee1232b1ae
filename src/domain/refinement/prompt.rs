//! Prompt construction for every message appended to a refinement thread.
//!
//! The builder is stateless: each method renders one message from the
//! session's prompt catalog and the caller's input.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::domain::settings::{FormatExample, PromptCatalog};

use super::parser::{CRITERIA_MARKER, STORY_MARKER};
use super::session::{AnsweredPrompt, RefinementRequest, Suggestion};
use super::RefinementPhase;

const JSON_ONLY_DIRECTIVE: &str =
    "Reply with the JSON array only. Do not add any explanation, heading or list around it.";

const NO_MORE_QUESTIONS_DIRECTIVE: &str =
    "Do not ask any further questions; give concrete suggestions instead.";

const ACCEPTED_HEADER: &str = "[Accepted suggestions]";
const NONE_ACCEPTED_LINE: &str = "(No suggestions were accepted this round.)";
const MODIFICATION_HEADER: &str = "[Modification request]";
const SUPPLEMENTARY_HEADER: &str = "[Supplementary info from the PM]";

const GUIDELINES: &str = "\
IMPORTANT GUIDELINES:
1. All your questions and suggestions must be directly related to this specific user story
2. Focus on clarifying implementation details, edge cases, and factors that could impact the successful delivery of THIS user story
3. Consider the product context deeply: understand the target users, core values, and business goals
4. Ask specific, actionable questions that can be answered with concrete information
5. Provide suggestions that are measurable, implementable, and aligned with the product vision
6. Avoid generic or theoretical questions or suggestions";

/// Renders instruction text for a refinement thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// `- role: prompt` lines for selected roles that have a configured
    /// prompt, in selection order.
    pub fn role_lines(&self, roles: &[String], catalog: &PromptCatalog) -> String {
        roles
            .iter()
            .filter_map(|role| {
                catalog
                    .role_prompt(role)
                    .map(|prompt| format!("- {}: {}\n", role, prompt))
            })
            .collect()
    }

    /// Format exemplars for `phase` limited to the selected roles, rendered
    /// as a JSON literal.
    pub fn format_exemplar(
        &self,
        phase: RefinementPhase,
        roles: &[String],
        catalog: &PromptCatalog,
    ) -> String {
        let selected: HashSet<&str> = roles.iter().map(String::as_str).collect();
        let filtered: Vec<&FormatExample> = catalog
            .format_examples(phase)
            .iter()
            .filter(|example| selected.contains(example.role.as_str()))
            .collect();
        serde_json::to_string(&filtered).unwrap_or_else(|_| "[]".to_string())
    }

    /// The per-round instruction asking the roles for questions or
    /// suggestions.
    pub fn phase_instruction(
        &self,
        phase: RefinementPhase,
        roles: &[String],
        catalog: &PromptCatalog,
        supplementary_info: Option<&str>,
    ) -> String {
        let mut out = String::new();

        if let Some(info) = supplementary_info.map(str::trim).filter(|i| !i.is_empty()) {
            let _ = write!(out, "{}\n{}\n\n", SUPPLEMENTARY_HEADER, info);
        }

        out.push_str(&self.phase_block(phase, roles, catalog));
        out
    }

    /// The first message of a thread: context, story, guidelines and the
    /// questioning block.
    pub fn opening_instruction(
        &self,
        product_context: &str,
        request: &RefinementRequest,
        catalog: &PromptCatalog,
    ) -> String {
        let mut out = String::from(
            "You are a multi-role requirement refinement assistant. \
             Your goal is to help a Product Manager refine a user story.\n\n",
        );

        let _ = write!(out, "Product Context: {}\n\n", product_context.trim());
        let _ = write!(
            out,
            "Current User Story to Refine: \"{}\"\n\n",
            request.initial_user_story.trim()
        );

        let stack = &request.tech_stack;
        if !stack.is_empty() {
            out.push_str("Tech stack:\n");
            for (label, value) in [
                ("Frontend", &stack.frontend),
                ("Backend", &stack.backend),
                ("Agent", &stack.agent),
            ] {
                if !value.trim().is_empty() {
                    let _ = writeln!(out, "- {}: {}", label, value.trim());
                }
            }
            out.push('\n');
        }

        out.push_str(GUIDELINES);
        out.push_str("\n\n");
        out.push_str(&self.phase_block(
            RefinementPhase::Questioning,
            &request.selected_roles,
            catalog,
        ));
        out
    }

    /// One line per answered prompt, or `None` when nothing was answered.
    pub fn answers_message(&self, answered: &[AnsweredPrompt]) -> Option<String> {
        if answered.is_empty() {
            return None;
        }
        Some(
            answered
                .iter()
                .map(|a| {
                    format!(
                        "PM answer to {}'s question \"{}\": {}\n",
                        a.role, a.prompt, a.answer
                    )
                })
                .collect(),
        )
    }

    /// The accepted list, stated explicitly even when empty.
    pub fn accepted_suggestions_message(&self, accepted: &[Suggestion]) -> String {
        let mut out = format!("{}\n", ACCEPTED_HEADER);
        let lines: Vec<String> = accepted
            .iter()
            .flat_map(|s| s.prompt.iter().map(move |p| format!("- {}: {}\n", s.role, p)))
            .collect();

        if lines.is_empty() {
            let _ = writeln!(out, "{}", NONE_ACCEPTED_LINE);
        } else {
            out.extend(lines);
        }
        out
    }

    /// The PM's modification request ahead of a finalize.
    pub fn modification_note_message(&self, note: &str) -> Option<String> {
        let note = note.trim();
        (!note.is_empty()).then(|| format!("{}\n{}", MODIFICATION_HEADER, note))
    }

    /// Asks for the rewritten story and five acceptance criteria.
    pub fn finalize_instruction(&self) -> String {
        format!(
            "Based on the full conversation history in this thread, rewrite an improved version of the user story.

Review carefully:
1. What the original user story was
2. Which questions each role asked
3. How the Product Manager answered them
4. Which suggestions each role offered
5. Which suggestions the Product Manager accepted

From this conversation:
- Integrate every valuable piece of information and requirement
- Resolve the problems and concerns raised
- Include the accepted suggestions
- Make the new user story more complete, specific and actionable
- Keep the user story aligned with the core values and user needs in the product context
- Make acceptance criteria specific, measurable and testable

Requirements:
1. Do not just repeat the original user story; improve and extend it substantively
2. The user story must name the user role, the goal and the value
3. Acceptance criteria should cover functional completeness, user experience, technical requirements and business value

Reply in exactly this format:

{story}
The improved user story

{criteria}
1. Acceptance criterion 1
2. Acceptance criterion 2
3. Acceptance criterion 3
4. Acceptance criterion 4
5. Acceptance criterion 5",
            story = STORY_MARKER,
            criteria = CRITERIA_MARKER,
        )
    }

    fn phase_block(&self, phase: RefinementPhase, roles: &[String], catalog: &PromptCatalog) -> String {
        let mut out = String::from("Roles:\n");
        out.push_str(&self.role_lines(roles, catalog));

        let description = catalog.phase_prompt(phase);
        if !description.trim().is_empty() {
            let _ = writeln!(out, "{}", description.trim());
        }

        let _ = writeln!(
            out,
            "Format example: {}",
            self.format_exemplar(phase, roles, catalog)
        );

        if phase == RefinementPhase::Suggesting {
            let _ = writeln!(out, "{}", NO_MORE_QUESTIONS_DIRECTIVE);
        }
        out.push_str(JSON_ONLY_DIRECTIVE);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn catalog() -> PromptCatalog {
        let mut role_prompts = BTreeMap::new();
        role_prompts.insert("PM".to_string(), "Focus on scope".to_string());
        role_prompts.insert("Designer".to_string(), "Focus on flows".to_string());

        let mut phase_prompts = BTreeMap::new();
        phase_prompts.insert("questioning".to_string(), "Ask one question each.".to_string());
        phase_prompts.insert("suggesting".to_string(), "Offer improvements.".to_string());

        let mut examples = BTreeMap::new();
        examples.insert(
            "questioning".to_string(),
            vec![
                FormatExample::new("PM", vec!["What is the goal?".into()]),
                FormatExample::new("QA", vec!["How do we test it?".into()]),
            ],
        );

        PromptCatalog {
            role_prompts,
            phase_prompts,
            phase_format_examples: examples,
        }
    }

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn role_lines_follow_request_order_and_skip_unknown_roles() {
        let lines = PromptBuilder::new().role_lines(&roles(&["Designer", "Ghost", "PM"]), &catalog());
        assert_eq!(lines, "- Designer: Focus on flows\n- PM: Focus on scope\n");
    }

    #[test]
    fn format_exemplar_only_contains_selected_roles() {
        let exemplar = PromptBuilder::new().format_exemplar(
            RefinementPhase::Questioning,
            &roles(&["PM"]),
            &catalog(),
        );
        assert_eq!(exemplar, r#"[{"role":"PM","prompt":["What is the goal?"]}]"#);
    }

    #[test]
    fn missing_phase_entries_render_empty_exemplar() {
        let exemplar = PromptBuilder::new().format_exemplar(
            RefinementPhase::Suggesting,
            &roles(&["PM"]),
            &catalog(),
        );
        assert_eq!(exemplar, "[]");
    }

    #[test]
    fn supplementary_info_comes_first_when_present() {
        let text = PromptBuilder::new().phase_instruction(
            RefinementPhase::Questioning,
            &roles(&["PM"]),
            &catalog(),
            Some("  Launch is in March  "),
        );
        assert!(text.starts_with(SUPPLEMENTARY_HEADER));
        assert!(text.contains("Launch is in March\n\nRoles:"));
    }

    #[test]
    fn blank_supplementary_info_is_omitted() {
        let text = PromptBuilder::new().phase_instruction(
            RefinementPhase::Questioning,
            &roles(&["PM"]),
            &catalog(),
            Some("   "),
        );
        assert!(text.starts_with("Roles:\n"));
    }

    #[test]
    fn suggesting_instruction_forbids_more_questions() {
        let builder = PromptBuilder::new();
        let suggesting =
            builder.phase_instruction(RefinementPhase::Suggesting, &roles(&["PM"]), &catalog(), None);
        let questioning =
            builder.phase_instruction(RefinementPhase::Questioning, &roles(&["PM"]), &catalog(), None);

        assert!(suggesting.contains("Offer improvements."));
        assert!(suggesting.contains(NO_MORE_QUESTIONS_DIRECTIVE));
        assert!(suggesting.ends_with(JSON_ONLY_DIRECTIVE));
        assert!(!questioning.contains(NO_MORE_QUESTIONS_DIRECTIVE));
        assert!(questioning.ends_with(JSON_ONLY_DIRECTIVE));
    }

    #[test]
    fn opening_instruction_carries_context_story_and_stack() {
        let mut request = RefinementRequest::new("As a user, I want X", roles(&["PM"]));
        request.tech_stack.backend = "Rust".to_string();

        let text = PromptBuilder::new().opening_instruction("Focus timer app", &request, &catalog());

        assert!(text.contains("Product Context: Focus timer app"));
        assert!(text.contains("\"As a user, I want X\""));
        assert!(text.contains("- Backend: Rust"));
        assert!(!text.contains("- Frontend:"));
        assert!(text.contains("IMPORTANT GUIDELINES"));
        assert!(text.contains("- PM: Focus on scope"));
    }

    #[test]
    fn answers_message_is_none_without_answers() {
        assert_eq!(PromptBuilder::new().answers_message(&[]), None);
    }

    #[test]
    fn answers_message_renders_one_line_per_answer() {
        let answered = vec![AnsweredPrompt {
            role: "PM".into(),
            prompt: "Why?".into(),
            answer: "Retention".into(),
        }];
        let text = PromptBuilder::new().answers_message(&answered).unwrap();
        assert_eq!(text, "PM answer to PM's question \"Why?\": Retention\n");
    }

    #[test]
    fn empty_accepted_list_is_stated_explicitly() {
        let text = PromptBuilder::new().accepted_suggestions_message(&[]);
        assert!(text.contains("No suggestions were accepted"));
        assert!(text.starts_with(ACCEPTED_HEADER));
    }

    #[test]
    fn accepted_list_renders_each_prompt_line() {
        let accepted = vec![Suggestion::new("PM", vec!["Add export".into(), "Add filter".into()])];
        let text = PromptBuilder::new().accepted_suggestions_message(&accepted);
        assert!(text.contains("- PM: Add export\n- PM: Add filter\n"));
        assert!(!text.contains("No suggestions"));
    }

    #[test]
    fn modification_note_requires_content() {
        let builder = PromptBuilder::new();
        assert_eq!(builder.modification_note_message("  "), None);
        assert_eq!(
            builder.modification_note_message(" shorter "),
            Some(format!("{}\nshorter", MODIFICATION_HEADER))
        );
    }

    #[test]
    fn finalize_instruction_names_both_markers() {
        let text = PromptBuilder::new().finalize_instruction();
        let story = text.find(STORY_MARKER).unwrap();
        let criteria = text.find(CRITERIA_MARKER).unwrap();
        assert!(story < criteria);
    }

    proptest! {
        #[test]
        fn instruction_always_ends_with_json_directive(
            info in proptest::option::of(".{0,40}"),
            selected in proptest::collection::vec("[A-Za-z]{1,8}", 0..5),
        ) {
            let text = PromptBuilder::new().phase_instruction(
                RefinementPhase::Questioning,
                &selected,
                &catalog(),
                info.as_deref(),
            );
            prop_assert!(text.ends_with(JSON_ONLY_DIRECTIVE));
        }
    }
}
