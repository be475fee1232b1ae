//! Application layer - orchestrates domain operations across ports.

pub mod refinement;

pub use refinement::{
    AcceptSuggestionsCommand, AcceptSuggestionsResult, ErrorKind, FinalizeCommand,
    RefinementError, RefinementOrchestrator, SubmitAnswersCommand,
};
