//! AI transport configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// AI transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Which transport serves the assistant
    #[serde(default)]
    pub provider: AiProvider,

    /// OpenAI API key
    pub openai_api_key: Option<Secret<String>>,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model for the shared assistant and its runs
    #[serde(default = "default_model")]
    pub model: String,

    /// Name used to find or create the shared assistant
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    /// Pins an existing assistant instead of resolving it by name
    pub assistant_id: Option<String>,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on transient failures
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// First delay between run status polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Upper bound for the delay between polls
    #[serde(default = "default_max_poll_interval")]
    pub max_poll_interval_ms: u64,

    /// Deadline for a run to finish
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
}

/// AI transport type
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    OpenAI,
    /// Scripted in-process transport for local runs without an API key
    Mock,
}

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Check if OpenAI is configured
    pub fn has_openai(&self) -> bool {
        self.openai_api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.provider == AiProvider::OpenAI && !self.has_openai() {
            return Err(ValidationError::MissingRequired("OPENAI_API_KEY"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.run_timeout_secs == 0 {
            return Err(ValidationError::InvalidRunTimeout);
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > self.max_poll_interval_ms {
            return Err(ValidationError::InvalidPollInterval);
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::default(),
            openai_api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            assistant_name: default_assistant_name(),
            assistant_id: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            poll_interval_ms: default_poll_interval(),
            max_poll_interval_ms: default_max_poll_interval(),
            run_timeout_secs: default_run_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "o4-mini".to_string()
}

fn default_assistant_name() -> String {
    "story-refiner".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    3
}

fn default_poll_interval() -> u64 {
    500
}

fn default_max_poll_interval() -> u64 {
    5_000
}

fn default_run_timeout() -> u64 {
    180
}
