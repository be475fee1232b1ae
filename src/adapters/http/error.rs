//! Error bodies shared by every HTTP adapter.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::application::RefinementError;
use crate::domain::foundation::ErrorCode;
use crate::ports::{SettingsError, TransportError};

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Maps a refinement failure to its status code and body.
pub fn handle_refinement_error(error: RefinementError) -> Response {
    let status = match &error {
        RefinementError::Validation(_) => StatusCode::BAD_REQUEST,
        RefinementError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        RefinementError::Transport(_)
        | RefinementError::RunFailed { .. }
        | RefinementError::Parse(_) => StatusCode::BAD_GATEWAY,
        RefinementError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        RefinementError::Config(_) | RefinementError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        tracing::error!(code = %error.code(), error = %error, "Refinement request failed");
    } else {
        tracing::warn!(code = %error.code(), error = %error, "Refinement request rejected");
    }

    let body = ErrorResponse::new(error.code(), error.to_string());
    let body = match &error {
        RefinementError::Parse(e) => body.with_details(json!({ "raw": e.raw })),
        RefinementError::RunFailed { status, message } => {
            body.with_details(json!({ "status": status.as_str(), "message": message }))
        }
        RefinementError::Transport(TransportError::RateLimited { retry_after_secs }) => {
            body.with_details(json!({ "retry_after_secs": retry_after_secs }))
        }
        _ => body,
    };

    (status, Json(body)).into_response()
}

/// Maps a settings failure to a 500.
pub fn handle_settings_error(error: SettingsError) -> Response {
    tracing::error!(error = %error, "Settings request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(ErrorCode::ConfigError, error.to_string())),
    )
        .into_response()
}
