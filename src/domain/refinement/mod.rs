//! Refinement domain - sessions, phases, prompts and reply parsing.
//!
//! A refinement session walks a user story through questioning and
//! suggesting rounds with a panel of roles played by the assistant, and can
//! be finalized into a rewritten story with acceptance criteria at any time.

mod parser;
mod phase;
mod prompt;
mod session;

pub use parser::{ParseError, ResponseParser, StructuredReply, CRITERIA_MARKER, STORY_MARKER};
pub use phase::RefinementPhase;
pub use prompt::PromptBuilder;
pub use session::{
    prompt_key, AnsweredPrompt, FinalizeResult, Question, RefinementRequest, RefinementSession,
    RoundArtifact, Suggestion, TechStack,
};
