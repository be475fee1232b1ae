//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, the state machine trait and the
//! validation error vocabulary shared by every other domain module.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{ErrorCode, ValidationError};
pub use ids::{SessionId, ThreadHandle};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
