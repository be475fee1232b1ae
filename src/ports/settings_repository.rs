//! Settings Repository Port - Loads and saves the application settings
//! document.

use async_trait::async_trait;

use crate::domain::settings::AppSettings;

/// Errors that can occur while loading or saving settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Io(String),

    #[error("Settings document is malformed: {0}")]
    Malformed(String),

    #[error("Failed to serialize settings: {0}")]
    SerializationFailed(String),
}

/// Port for the operator-editable settings document.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Loads the current settings. A repository with nothing stored yet
    /// returns the default document.
    async fn load(&self) -> Result<AppSettings, SettingsError>;

    /// Replaces the stored settings.
    async fn save(&self, settings: &AppSettings) -> Result<(), SettingsError>;
}
