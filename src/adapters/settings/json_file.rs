//! JSON file settings repository.
//!
//! Reads and writes the settings document as pretty-printed JSON. Writes go
//! through a temporary file and a rename so readers never see a partial
//! document.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::domain::settings::AppSettings;
use crate::ports::{SettingsError, SettingsRepository};

/// Settings repository backed by a single JSON file.
#[derive(Debug)]
pub struct JsonFileSettingsRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSettingsRepository {
    /// Creates a repository for the document at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the settings document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent_dir(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SettingsError::Io(format!("Failed to create directory: {}", e)))?;
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for JsonFileSettingsRepository {
    async fn load(&self) -> Result<AppSettings, SettingsError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "Settings file missing, using defaults");
                return Ok(AppSettings::default());
            }
            Err(e) => {
                return Err(SettingsError::Io(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&content)
            .map_err(|e| SettingsError::Malformed(format!("{}: {}", self.path.display(), e)))
    }

    async fn save(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| SettingsError::SerializationFailed(e.to_string()))?;

        let _guard = self.write_lock.lock().await;
        self.ensure_parent_dir().await?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)
            .await
            .map_err(|e| SettingsError::Io(format!("Failed to write temporary file: {}", e)))?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| SettingsError::Io(format!("Failed to rename file: {}", e)))?;

        tracing::info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}
