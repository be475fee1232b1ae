//! HTTP handlers for the settings document.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::error::handle_settings_error;
use crate::adapters::http::refinement::MessageResponse;
use crate::domain::settings::AppSettings;
use crate::ports::SettingsRepository;

#[derive(Clone)]
pub struct SettingsHandlers {
    repository: Arc<dyn SettingsRepository>,
}

impl SettingsHandlers {
    pub fn new(repository: Arc<dyn SettingsRepository>) -> Self {
        Self { repository }
    }
}

/// GET /api/config/app
pub async fn get_settings(State(handlers): State<SettingsHandlers>) -> Response {
    match handlers.repository.load().await {
        Ok(settings) => (StatusCode::OK, Json(settings)).into_response(),
        Err(e) => handle_settings_error(e),
    }
}

/// POST /api/config/app - Replace the whole document
pub async fn save_settings(
    State(handlers): State<SettingsHandlers>,
    Json(settings): Json<AppSettings>,
) -> Response {
    match handlers.repository.save(&settings).await {
        Ok(()) => {
            tracing::info!(
                roles = settings.prompts.role_prompts.len(),
                "App settings saved"
            );
            let response = MessageResponse {
                message: "App config saved successfully".to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_settings_error(e),
    }
}
