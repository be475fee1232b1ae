//! Location of the editable settings document

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Where the prompt catalog and product context are stored.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

impl SettingsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ValidationError::EmptySettingsPath);
        }
        Ok(())
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("config/app_config.json")
}
