//! Refinement session aggregate and the artifacts a round produces.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::foundation::{SessionId, StateMachine, ThreadHandle, Timestamp, ValidationError};
use crate::domain::settings::{ModelParams, PromptCatalog};

use super::RefinementPhase;

// ════════════════════════════════════════════════════════════════════════════════
// Request
// ════════════════════════════════════════════════════════════════════════════════

/// Technology context the operator attaches to a refinement request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechStack {
    #[serde(default)]
    pub frontend: String,
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub agent: String,
}

impl TechStack {
    pub fn is_empty(&self) -> bool {
        self.frontend.trim().is_empty()
            && self.backend.trim().is_empty()
            && self.agent.trim().is_empty()
    }
}

/// The request that opens a refinement session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinementRequest {
    pub initial_user_story: String,
    #[serde(default)]
    pub tech_stack: TechStack,
    #[serde(default)]
    pub model_params: ModelParams,
    #[serde(default)]
    pub selected_roles: Vec<String>,
}

impl RefinementRequest {
    pub fn new(story: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            initial_user_story: story.into(),
            selected_roles: roles,
            ..Default::default()
        }
    }

    /// Rejects blank stories and empty role lists.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.initial_user_story.trim().is_empty() {
            return Err(ValidationError::empty_field("initial_user_story"));
        }
        if self.selected_roles.iter().all(|r| r.trim().is_empty()) {
            return Err(ValidationError::empty_field("selected_roles"));
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Round artifacts
// ════════════════════════════════════════════════════════════════════════════════

/// Builds the key a caller uses to address one prompt line of a role.
pub fn prompt_key(role: &str, prompt: &str) -> String {
    format!("{}_{}", role, prompt)
}

/// Accepts either a single string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(prompt) => vec![prompt],
        OneOrMany::Many(prompts) => prompts,
    })
}

/// Questions one role asks the PM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub role: String,
    #[serde(deserialize_with = "one_or_many")]
    pub prompt: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl Question {
    pub fn new(role: impl Into<String>, prompt: Vec<String>) -> Self {
        Self {
            role: role.into(),
            prompt,
            answer: None,
        }
    }
}

/// Suggestions one role offers the PM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub role: String,
    #[serde(deserialize_with = "one_or_many")]
    pub prompt: Vec<String>,
}

impl Suggestion {
    pub fn new(role: impl Into<String>, prompt: Vec<String>) -> Self {
        Self {
            role: role.into(),
            prompt,
        }
    }
}

/// One prompt line the PM answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsweredPrompt {
    pub role: String,
    pub prompt: String,
    pub answer: String,
}

/// Outcome of a finalize call. `raw` is always the untouched reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeResult {
    pub user_story: String,
    pub acceptance_criteria: Vec<String>,
    pub raw: String,
}

/// What a generation round produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundArtifact {
    Questions(Vec<Question>),
    Suggestions(Vec<Suggestion>),
}

impl RoundArtifact {
    /// Phase the session enters when this artifact is committed.
    pub fn phase(&self) -> RefinementPhase {
        match self {
            RoundArtifact::Questions(_) => RefinementPhase::Questioning,
            RoundArtifact::Suggestions(_) => RefinementPhase::Suggesting,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RoundArtifact::Questions(q) => q.len(),
            RoundArtifact::Suggestions(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Session aggregate
// ════════════════════════════════════════════════════════════════════════════════

/// A multi-round refinement conversation bound to one AI thread.
///
/// Exactly one of `questions` / `suggestions` is populated, matching `phase`.
/// Both lists are only replaced through [`RefinementSession::enter_round`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementSession {
    id: SessionId,
    thread: ThreadHandle,
    request: RefinementRequest,
    user_story: String,
    #[serde(flatten)]
    prompts: PromptCatalog,
    phase: RefinementPhase,
    questions: Vec<Question>,
    suggestions: Vec<Suggestion>,
    history: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    supplementary_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modification_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_draft: Option<FinalizeResult>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl RefinementSession {
    /// Creates a session in the questioning phase.
    pub fn new(
        id: SessionId,
        thread: ThreadHandle,
        request: RefinementRequest,
        prompts: PromptCatalog,
        questions: Vec<Question>,
    ) -> Self {
        let now = Timestamp::now();
        let user_story = request.initial_user_story.clone();
        Self {
            id,
            thread,
            request,
            user_story,
            prompts,
            phase: RefinementPhase::Questioning,
            questions,
            suggestions: Vec::new(),
            history: vec!["Session started in QUESTIONING phase".to_string()],
            supplementary_info: None,
            modification_note: None,
            latest_draft: None,
            created_at: now,
            updated_at: now,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn thread(&self) -> &ThreadHandle {
        &self.thread
    }

    pub fn request(&self) -> &RefinementRequest {
        &self.request
    }

    pub fn user_story(&self) -> &str {
        &self.user_story
    }

    pub fn selected_roles(&self) -> &[String] {
        &self.request.selected_roles
    }

    pub fn prompts(&self) -> &PromptCatalog {
        &self.prompts
    }

    pub fn phase(&self) -> RefinementPhase {
        self.phase
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn supplementary_info(&self) -> Option<&str> {
        self.supplementary_info.as_deref()
    }

    pub fn modification_note(&self) -> Option<&str> {
        self.modification_note.as_deref()
    }

    pub fn latest_draft(&self) -> Option<&FinalizeResult> {
        self.latest_draft.as_ref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Fails unless the session is currently in `expected`.
    pub fn ensure_phase(&self, expected: RefinementPhase, operation: &str) -> Result<(), ValidationError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!(
                    "{} requires phase {} but session is in {}",
                    operation, expected, self.phase
                ),
            ))
        }
    }

    /// Matches submitted answers against the current questions.
    ///
    /// Keys are `"<role>_<prompt>"`; blank answers and keys that match no
    /// current prompt are ignored. Order follows the question list.
    pub fn match_answers(&self, answers: &HashMap<String, String>) -> Vec<AnsweredPrompt> {
        self.questions
            .iter()
            .flat_map(|q| q.prompt.iter().map(move |p| (q, p)))
            .filter_map(|(q, p)| {
                answers
                    .get(&prompt_key(&q.role, p))
                    .map(|a| a.trim())
                    .filter(|a| !a.is_empty())
                    .map(|a| AnsweredPrompt {
                        role: q.role.clone(),
                        prompt: p.clone(),
                        answer: a.to_string(),
                    })
            })
            .collect()
    }

    /// Current suggestions narrowed to the prompt lines named by `keys`.
    pub fn suggestions_matching(&self, keys: &[String]) -> Vec<Suggestion> {
        let wanted: HashSet<&str> = keys.iter().map(String::as_str).collect();
        self.suggestions
            .iter()
            .filter_map(|s| {
                let prompt: Vec<String> = s
                    .prompt
                    .iter()
                    .filter(|p| wanted.contains(prompt_key(&s.role, p).as_str()))
                    .cloned()
                    .collect();
                (!prompt.is_empty()).then(|| Suggestion::new(s.role.clone(), prompt))
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Records answers on the current questions, joining multiple lines per
    /// role with newlines.
    pub fn record_answers(&mut self, answered: &[AnsweredPrompt]) {
        if answered.is_empty() {
            return;
        }
        for question in &mut self.questions {
            let lines: Vec<&str> = answered
                .iter()
                .filter(|a| a.role == question.role && question.prompt.contains(&a.prompt))
                .map(|a| a.answer.as_str())
                .collect();
            if !lines.is_empty() {
                question.answer = Some(lines.join("\n"));
            }
        }
        self.history
            .push(format!("PM answered {} prompt(s)", answered.len()));
        self.touch();
    }

    /// Commits a generated artifact, moving to its phase and clearing the
    /// other list.
    pub fn enter_round(&mut self, artifact: RoundArtifact) -> Result<(), ValidationError> {
        let target = artifact.phase();
        self.phase = self.phase.transition_to(target)?;
        let count = artifact.len();
        match artifact {
            RoundArtifact::Questions(questions) => {
                self.questions = questions;
                self.suggestions.clear();
            }
            RoundArtifact::Suggestions(suggestions) => {
                self.suggestions = suggestions;
                self.questions.clear();
            }
        }
        self.history.push(format!(
            "Entered {} phase with {} {}",
            target,
            count,
            target.artifact()
        ));
        self.touch();
        Ok(())
    }

    /// Replaces the prompt catalog with the latest settings.
    pub fn refresh_prompts(&mut self, prompts: PromptCatalog) {
        self.prompts = prompts;
    }

    /// Stores the supplementary info sent with the latest round.
    pub fn set_supplementary_info(&mut self, info: Option<String>) {
        self.supplementary_info = info.filter(|i| !i.trim().is_empty());
        self.touch();
    }

    /// Notes which suggestions the PM accepted.
    pub fn record_accepted(&mut self, accepted: &[Suggestion]) {
        let entry = if accepted.is_empty() {
            "PM accepted no suggestions".to_string()
        } else {
            format!("PM accepted suggestions from {} role(s)", accepted.len())
        };
        self.history.push(entry);
        self.touch();
    }

    /// Stores a finalize draft. Phase and round artifacts are left as-is.
    pub fn record_draft(&mut self, draft: FinalizeResult, modification_note: Option<String>) {
        if let Some(note) = modification_note.filter(|n| !n.trim().is_empty()) {
            self.history.push(format!("PM requested modification: {}", note));
            self.modification_note = Some(note);
        }
        self.user_story = draft.user_story.clone();
        self.history.push(format!(
            "Finalize draft produced with {} acceptance criteria",
            draft.acceptance_criteria.len()
        ));
        self.latest_draft = Some(draft);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}
