//! Error types for the domain layer.

use std::fmt;
use thiserror::Error;

/// Errors that occur when caller input fails validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::EmptyField { field } => field,
            ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

/// Error codes reported to callers, organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,
    SessionNotFound,
    InvalidStateTransition,

    // AI collaborator errors
    AIProviderError,
    RateLimited,
    RunFailed,
    ParseFailed,
    Timeout,

    // Infrastructure errors
    ConfigError,
    InternalError,
}

impl ErrorCode {
    /// Returns true for codes caused by bad caller input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorCode::ValidationFailed
                | ErrorCode::SessionNotFound
                | ErrorCode::InvalidStateTransition
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::AIProviderError => "AI_PROVIDER_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::RunFailed => "RUN_FAILED",
            ErrorCode::ParseFailed => "PARSE_FAILED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("selected_roles");
        assert_eq!(format!("{}", err), "Field 'selected_roles' cannot be empty");
    }

    #[test]
    fn validation_error_invalid_format_displays_correctly() {
        let err = ValidationError::invalid_format("session_id", "not a UUID");
        assert_eq!(
            format!("{}", err),
            "Field 'session_id' has invalid format: not a UUID"
        );
    }

    #[test]
    fn validation_error_exposes_field() {
        assert_eq!(ValidationError::empty_field("story").field(), "story");
        assert_eq!(
            ValidationError::invalid_format("phase", "nope").field(),
            "phase"
        );
    }

    #[test]
    fn error_code_display_formats_correctly() {
        assert_eq!(format!("{}", ErrorCode::SessionNotFound), "SESSION_NOT_FOUND");
        assert_eq!(format!("{}", ErrorCode::ParseFailed), "PARSE_FAILED");
        assert_eq!(format!("{}", ErrorCode::InternalError), "INTERNAL_ERROR");
    }

    #[test]
    fn error_code_validation_classification() {
        assert!(ErrorCode::ValidationFailed.is_validation());
        assert!(ErrorCode::SessionNotFound.is_validation());
        assert!(ErrorCode::InvalidStateTransition.is_validation());
        assert!(!ErrorCode::RunFailed.is_validation());
        assert!(!ErrorCode::ParseFailed.is_validation());
        assert!(!ErrorCode::Timeout.is_validation());
    }
}
