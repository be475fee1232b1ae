//! Refinement phases.
//!
//! A session is always either collecting questions from the selected roles
//! or collecting suggestions from them. Finalizing produces a parallel
//! artifact and never becomes a stored phase.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// The stored phase of a refinement session.
///
/// Serialized as `QUESTIONING` / `SUGGESTING`; the lowercase phase keys used
/// by settings files and `next_phase` fields are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefinementPhase {
    #[serde(rename = "QUESTIONING", alias = "questioning")]
    Questioning,
    #[serde(rename = "SUGGESTING", alias = "suggesting")]
    Suggesting,
}

impl RefinementPhase {
    /// Lowercase key used to look up phase prompts and format exemplars.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Questioning => "questioning",
            Self::Suggesting => "suggesting",
        }
    }

    /// Uppercase label used on the wire.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Questioning => "QUESTIONING",
            Self::Suggesting => "SUGGESTING",
        }
    }

    /// Returns the artifact this phase collects, for prompts and logs.
    pub fn artifact(&self) -> &'static str {
        match self {
            Self::Questioning => "questions",
            Self::Suggesting => "suggestions",
        }
    }
}

impl StateMachine for RefinementPhase {
    fn valid_transitions(&self) -> Vec<Self> {
        // Both phases may loop on themselves or switch; the operation that
        // drives the switch is what restricts entry (see the orchestrator).
        match self {
            Self::Questioning => vec![Self::Questioning, Self::Suggesting],
            Self::Suggesting => vec![Self::Questioning, Self::Suggesting],
        }
    }
}

impl fmt::Display for RefinementPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RefinementPhase {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "questioning" => Ok(Self::Questioning),
            "suggesting" => Ok(Self::Suggesting),
            other => Err(ValidationError::invalid_format(
                "phase",
                format!("unknown phase '{}', expected questioning or suggesting", other),
            )),
        }
    }
}
