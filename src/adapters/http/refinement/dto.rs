//! Request and response bodies for refinement endpoints.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::foundation::Timestamp;
use crate::domain::refinement::{
    FinalizeResult, Question, RefinementPhase, RefinementRequest, RefinementSession, Suggestion,
};
use crate::domain::settings::FormatExample;

// ════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════

/// Body of both submit-answers endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswersRequest {
    pub session_id: String,
    #[serde(default)]
    pub answers: HashMap<String, String>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcceptSuggestionsRequest {
    pub session_id: String,
    #[serde(default)]
    pub accepted_suggestions: Vec<Suggestion>,
    pub next_phase: String,
    #[serde(default)]
    pub additional_info: Option<String>,
}

/// `current_suggestions` holds `"<role>_<prompt>"` keys.
#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeRequest {
    pub session_id: String,
    #[serde(default)]
    pub current_phase: Option<String>,
    #[serde(default)]
    pub current_answers: HashMap<String, String>,
    #[serde(default)]
    pub current_suggestions: Vec<String>,
    #[serde(default)]
    pub modification_suggestion: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub thread_id: String,
    pub request: RefinementRequest,
    pub user_story: String,
    pub role_prompts: BTreeMap<String, String>,
    pub phase_prompts: BTreeMap<String, String>,
    pub phase_format_examples: BTreeMap<String, Vec<FormatExample>>,
    pub phase: RefinementPhase,
    pub questions: Vec<Question>,
    pub suggestions: Vec<Suggestion>,
    pub history: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_draft: Option<FinalizeResponse>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<RefinementSession> for SessionResponse {
    fn from(session: RefinementSession) -> Self {
        let prompts = session.prompts().clone();
        Self {
            id: session.id().to_string(),
            thread_id: session.thread().to_string(),
            request: session.request().clone(),
            user_story: session.user_story().to_string(),
            role_prompts: prompts.role_prompts,
            phase_prompts: prompts.phase_prompts,
            phase_format_examples: prompts.phase_format_examples,
            phase: session.phase(),
            questions: session.questions().to_vec(),
            suggestions: session.suggestions().to_vec(),
            history: session.history().to_vec(),
            additional_info: session.supplementary_info().map(str::to_string),
            modification_suggestion: session.modification_note().map(str::to_string),
            latest_draft: session.latest_draft().cloned().map(Into::into),
            created_at: session.created_at(),
            updated_at: session.updated_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptSuggestionsResponse {
    pub session: SessionResponse,
    pub previous_result: Vec<Suggestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalizeResponse {
    pub user_story: String,
    pub ac: Vec<String>,
    pub raw_ai_response: String,
}

impl From<FinalizeResult> for FinalizeResponse {
    fn from(result: FinalizeResult) -> Self {
        Self {
            user_story: result.user_story,
            ac: result.acceptance_criteria,
            raw_ai_response: result.raw,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
