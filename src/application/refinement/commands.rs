//! Commands and results for refinement operations.

use std::collections::HashMap;

use crate::domain::foundation::SessionId;
use crate::domain::refinement::{RefinementPhase, RefinementSession, Suggestion};

/// Answers to the current questions, keyed `"<role>_<prompt>"`.
#[derive(Debug, Clone)]
pub struct SubmitAnswersCommand {
    pub session_id: SessionId,
    pub answers: HashMap<String, String>,
    pub additional_info: Option<String>,
}

/// Suggestions the PM accepted and the phase to continue in.
#[derive(Debug, Clone)]
pub struct AcceptSuggestionsCommand {
    pub session_id: SessionId,
    pub accepted: Vec<Suggestion>,
    pub next_phase: RefinementPhase,
    pub additional_info: Option<String>,
}

/// Result of accepting suggestions.
#[derive(Debug, Clone)]
pub struct AcceptSuggestionsResult {
    pub session: RefinementSession,
    /// The accepted list as submitted.
    pub previous_accepted: Vec<Suggestion>,
}

/// Request for a finalized story.
///
/// `current_phase` tells which in-progress input to fold in first; it
/// defaults to the stored phase.
#[derive(Debug, Clone)]
pub struct FinalizeCommand {
    pub session_id: SessionId,
    pub current_phase: Option<RefinementPhase>,
    pub current_answers: HashMap<String, String>,
    pub current_suggestion_keys: Vec<String>,
    pub modification_note: Option<String>,
}

impl FinalizeCommand {
    /// A finalize with no pending input.
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            current_phase: None,
            current_answers: HashMap::new(),
            current_suggestion_keys: Vec::new(),
            modification_note: None,
        }
    }
}
