//! Unified error classification and recovery.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Authorization,
    NotFound,
    Validation,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Storage,
    Unknown,
}

/// Error envelope returned by the blog API: `{ status, message, statusCode?, errors? }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Per-field validation messages.
    #[serde(default)]
    pub errors: Option<BTreeMap<String, String>>,
}

impl ErrorDetails {
    /// Parse the server's error envelope, if the body is one.
    pub fn parse(body: &str) -> Option<Self> {
        let details: Self = serde_json::from_str(body).ok()?;
        if details.message.is_none() && details.errors.is_none() {
            return None;
        }
        Some(details)
    }
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    LogInAgain,
    FixInput,
    CheckConfiguration,
    IncreaseTimeout,
    ContactSupport,
}
