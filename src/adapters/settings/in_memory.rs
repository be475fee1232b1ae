//! In-memory settings repository for tests and development.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::settings::AppSettings;
use crate::ports::{SettingsError, SettingsRepository};

/// Settings held in memory. Clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct InMemorySettingsRepository {
    settings: Arc<RwLock<AppSettings>>,
}

impl InMemorySettingsRepository {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
        }
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn load(&self) -> Result<AppSettings, SettingsError> {
        Ok(self.settings.read().await.clone())
    }

    async fn save(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        *self.settings.write().await = settings.clone();
        Ok(())
    }
}
