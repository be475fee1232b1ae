//! State machine trait for phase enums.
//!
//! Gives every lifecycle enum the same validated-transition API so callers
//! never assign a new phase directly.

use super::ValidationError;

/// Trait for enums that represent state machines.
///
/// Implementors list their legal targets; `transition_to` and
/// `can_transition_to` are derived from that list.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for RefinementPhase {
///     fn valid_transitions(&self) -> Vec<Self> {
///         vec![Questioning, Suggesting]
///     }
/// }
///
/// let next = session.phase.transition_to(RefinementPhase::Suggesting)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
