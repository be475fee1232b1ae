//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `refinement` - Refinement sessions, phases, prompt building and reply parsing
//! - `settings` - The application settings document

pub mod foundation;
pub mod refinement;
pub mod settings;
