//! HTTP routes for the settings document.

use axum::{routing::get, Router};

use super::handlers::{get_settings, save_settings, SettingsHandlers};

/// Creates the settings router, mounted under `/api/config`.
pub fn settings_routes(handlers: SettingsHandlers) -> Router {
    Router::new()
        .route("/app", get(get_settings).post(save_settings))
        .with_state(handlers)
}
