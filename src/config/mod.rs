//! Client configuration (layered: code > env > defaults).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const TOKEN_FILE_NAME: &str = "session.toml";

/// Connection and session settings for the blog API client.
///
/// Resolution order:
/// 1. Explicit `with_*` setters
/// 2. Environment variables (`QUILL_API_BASE_URL`, `QUILL_TOKEN_PATH`, `QUILL_TIMEOUT_SECS`),
///    optionally loaded from a `.env` file
/// 3. Built-in defaults
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use quill::config::ClientConfig;
///
/// let config = ClientConfig::new("https://blog.example.com")
///     .with_timeout(Duration::from_secs(10));
/// assert_eq!(config.endpoint("/articles"), "https://blog.example.com/api/v1/articles");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    api_prefix: String,
    timeout: Duration,
    token_path: PathBuf,
    login_route: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base_url(base_url.into()),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token_path: default_quill_dir().join(TOKEN_FILE_NAME),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
        }
    }

    /// Load from environment variables, reading `.env` if present.
    pub fn from_env() -> Result<Self, ApiError> {
        let _ = dotenvy::dotenv();
        let mut config = match std::env::var("QUILL_API_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Self::new(url),
            _ => Self::default(),
        };

        if let Ok(path) = std::env::var("QUILL_TOKEN_PATH") {
            config.token_path = PathBuf::from(path);
        }

        if let Ok(raw) = std::env::var("QUILL_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ApiError::Configuration(format!("QUILL_TIMEOUT_SECS must be an integer, got {raw:?}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = trim_base_url(base_url.into());
        self
    }

    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn token_path(&self) -> &PathBuf {
        &self.token_path
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Absolute URL for an API path such as `/articles/42`.
    pub fn endpoint(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}/{path}", self.base_url)
        } else {
            format!("{}/{prefix}/{path}", self.base_url)
        }
    }

    /// Build the underlying HTTP client. The cookie jar carries the refresh session.
    pub fn build_http_client(&self) -> Result<reqwest::Client, ApiError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .cookie_store(true)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| ApiError::Configuration(format!("failed to build HTTP client: {e}")))
    }
}

/// Default directory for persisted session state (`~/.quill`).
pub fn default_quill_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".quill"))
        .unwrap_or_else(|| PathBuf::from(".quill"))
}

fn trim_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
