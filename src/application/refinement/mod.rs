//! Refinement use cases: start, answer, accept, finalize.

mod accept_suggestions;
mod commands;
mod errors;
mod finalize;
mod orchestrator;
mod start;
mod submit_answers;

pub use commands::{
    AcceptSuggestionsCommand, AcceptSuggestionsResult, FinalizeCommand, SubmitAnswersCommand,
};
pub use errors::{ErrorKind, RefinementError};
pub use orchestrator::RefinementOrchestrator;
