//! Base HTTP transport and request/response values.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::AccessToken;
use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorDetails, Result};

/// Request body that can be rebuilt for every attempt (replays included).
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(MultipartBody),
}

impl RequestBody {
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FilePart {
    name: String,
    file_name: String,
    mime: String,
    bytes: Vec<u8>,
}

/// Multipart form data kept as plain values so it can be sent more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartBody {
    fields: Vec<(String, String)>,
    files: Vec<FilePart>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.files.push(FilePart {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        });
        self
    }

    pub fn text_fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Names of the file parts.
    pub fn files(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    fn to_form(&self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for file in &self.files {
            let part = reqwest::multipart::Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.mime)?;
            form = form.part(file.name.clone(), part);
        }
        Ok(form)
    }
}

/// A request against the API, relative to the configured prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Whether a 401 may trigger a token refresh. Off for credential endpoints,
    /// where a 401 means "wrong password", not "expired token".
    pub refreshable: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            refreshable: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn without_refresh(mut self) -> Self {
        self.refreshable = false;
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_json<T: Serialize>(self, body: &T) -> Result<Self> {
        Ok(self.with_body(RequestBody::json(body)?))
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Add every scalar field of a serializable struct as a query parameter.
    pub fn with_query<T: Serialize>(mut self, params: &T) -> Result<Self> {
        let serde_json::Value::Object(map) = serde_json::to_value(params)? else {
            return Err(ApiError::InvalidArgument(
                "query parameters must serialize to an object".to_string(),
            ));
        };
        for (name, value) in map {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => self.query.push((name, s)),
                other => self.query.push((name, other.to_string())),
            }
        }
        Ok(self)
    }
}

/// Raw response: status plus body text. Any status is a valid response here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Pass 2xx responses through; turn everything else into an [`ApiError`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            return Ok(self);
        }
        Err(status_to_error(self.status.as_u16(), &self.body))
    }
}

/// Map a non-success status and body to an error.
pub fn status_to_error(status: u16, body: &str) -> ApiError {
    let details = ErrorDetails::parse(body);
    let message = details
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| fallback_message(status, body));
    match (status, details) {
        (401, _) => ApiError::Unauthorized(message),
        (_, Some(details)) => ApiError::api_with_details(status, message, details),
        (_, None) => ApiError::api(status, message),
    }
}

fn fallback_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// The undecorated HTTP call.
///
/// Implementations return `Ok` for every HTTP status and reserve `Err` for
/// transport failures, so decorators can inspect statuses such as 401.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest, token: Option<&AccessToken>) -> Result<ApiResponse>;
}

/// [`Transport`] over `reqwest`, with a cookie jar for the refresh session.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = config.build_http_client()?;
        Ok(Self { client, config })
    }

    pub fn with_client(config: ClientConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest, token: Option<&AccessToken>) -> Result<ApiResponse> {
        let url = self.config.endpoint(&request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, token.bearer());
        }
        builder = match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Multipart(body)) => builder.multipart(body.to_form()?),
            None => builder,
        };

        tracing::debug!(method = %request.method, path = %request.path, "Sending API request");
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(method = %request.method, path = %request.path, status = status.as_u16(), "API response");
        Ok(ApiResponse::new(status, body))
    }
}
