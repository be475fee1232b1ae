//! Application settings - the operator-editable configuration document.
//!
//! Holds the product context and the prompt catalog (role prompts, phase
//! descriptions, format exemplars) that shape every refinement round. The
//! document is loaded and saved through the `SettingsRepository` port.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::refinement::RefinementPhase;

/// A literal reply exemplar for one role, embedded verbatim in prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatExample {
    pub role: String,
    #[serde(default)]
    pub prompt: Vec<String>,
}

impl FormatExample {
    pub fn new(role: impl Into<String>, prompt: Vec<String>) -> Self {
        Self {
            role: role.into(),
            prompt,
        }
    }
}

/// Model tuning parameters forwarded to the AI transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ModelParams {
    /// Fills unset fields from `fallback`.
    pub fn or(&self, fallback: &ModelParams) -> ModelParams {
        ModelParams {
            temperature: self.temperature.or(fallback.temperature),
            max_tokens: self.max_tokens.or(fallback.max_tokens),
            model: self.model.clone().or_else(|| fallback.model.clone()),
        }
    }
}

/// Role prompts, phase descriptions and format exemplars.
///
/// Phase maps are keyed by the lowercase phase key (`questioning`,
/// `suggesting`) to stay compatible with hand-edited settings files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptCatalog {
    #[serde(default)]
    pub role_prompts: BTreeMap<String, String>,
    #[serde(default)]
    pub phase_prompts: BTreeMap<String, String>,
    #[serde(default)]
    pub phase_format_examples: BTreeMap<String, Vec<FormatExample>>,
}

impl PromptCatalog {
    /// Prompt configured for a role, if any.
    pub fn role_prompt(&self, role: &str) -> Option<&str> {
        self.role_prompts.get(role).map(String::as_str)
    }

    /// Phase description, or the empty string when none is configured.
    pub fn phase_prompt(&self, phase: RefinementPhase) -> &str {
        self.phase_prompts
            .get(phase.key())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Format exemplars configured for a phase.
    pub fn format_examples(&self, phase: RefinementPhase) -> &[FormatExample] {
        self.phase_format_examples
            .get(phase.key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The full settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub product_context: String,
    #[serde(flatten)]
    pub prompts: PromptCatalog,
    #[serde(default)]
    pub model_params: ModelParams,
}
