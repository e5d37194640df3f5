//! Error types for Quill.

pub mod unified;

pub use unified::{ErrorCategory, ErrorDetails, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all Quill operations.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        details: Option<ErrorDetails>,
    },

    /// A 401 that was not (or could no longer be) recovered by a token refresh.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The refresh-token call failed; the session has been cleared.
    #[error("Session refresh failed: {message}")]
    RefreshFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ApiError {
    /// Create an API error from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Create an API error carrying the server's error envelope.
    pub fn api_with_details(status: u16, message: impl Into<String>, details: ErrorDetails) -> Self {
        Self::Api {
            status,
            message: message.into(),
            details: Some(details),
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            Self::RefreshFailed { status, .. } => *status,
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized(_) | Self::RefreshFailed { .. } | Self::NotLoggedIn => {
                ErrorCategory::Authentication
            }
            Self::Network(err) if err.is_timeout() => ErrorCategory::Timeout,
            Self::Network(_) => ErrorCategory::Network,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Io(_) | Self::Storage(_) => ErrorCategory::Storage,
            Self::InvalidArgument(_) => ErrorCategory::Validation,
            Self::Api { status, .. } => match status {
                400 | 422 => ErrorCategory::Validation,
                401 => ErrorCategory::Authentication,
                403 => ErrorCategory::Authorization,
                404 => ErrorCategory::NotFound,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::LogInAgain,
            ErrorCategory::Validation => RecoverySuggestion::FixInput,
            ErrorCategory::RateLimit
            | ErrorCategory::Network
            | ErrorCategory::Server => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Configuration | ErrorCategory::Storage => {
                RecoverySuggestion::CheckConfiguration
            }
            _ => RecoverySuggestion::ContactSupport,
        }
    }

    /// Per-field validation messages from the server, if any.
    pub fn field_errors(&self) -> Option<&std::collections::BTreeMap<String, String>> {
        match self {
            Self::Api {
                details: Some(details),
                ..
            } => details.errors.as_ref(),
            _ => None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_status() {
        let err = ApiError::api(404, "Article not found");
        assert_eq!(err.to_string(), "API error (status 404): Article not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn status_codes_map_to_categories() {
        assert_eq!(ApiError::api(400, "bad").category(), ErrorCategory::Validation);
        assert_eq!(ApiError::api(403, "no").category(), ErrorCategory::Authorization);
        assert_eq!(ApiError::api(404, "gone").category(), ErrorCategory::NotFound);
        assert_eq!(ApiError::api(503, "down").category(), ErrorCategory::Server);
        assert_eq!(ApiError::api(418, "teapot").category(), ErrorCategory::Api);
    }

    #[test]
    fn refresh_failure_asks_for_new_login() {
        let err = ApiError::RefreshFailed {
            status: Some(401),
            message: "refresh token expired".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert_eq!(err.recovery_suggestion(), RecoverySuggestion::LogInAgain);
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(ApiError::api(502, "bad gateway").is_retryable());
        assert!(!ApiError::api(422, "invalid").is_retryable());
    }

    #[test]
    fn field_errors_come_from_details() {
        let details = ErrorDetails::parse(
            r#"{"status":"fail","message":"Validation failed","errors":{"title":"required"}}"#,
        )
        .unwrap();
        let err = ApiError::api_with_details(400, "Validation failed", details);
        assert_eq!(
            err.field_errors().and_then(|e| e.get("title")).map(String::as_str),
            Some("required")
        );
    }

    #[test]
    fn non_envelope_bodies_have_no_details() {
        assert!(ErrorDetails::parse("<html>502</html>").is_none());
        assert!(ErrorDetails::parse(r#"{"status":"fail"}"#).is_none());
    }
}
