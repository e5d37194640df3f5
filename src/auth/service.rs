use std::sync::Arc;

use crate::cache::QueryKey;
use crate::client::{ApiRequest, AuthenticatedClient, Transport};
use crate::error::{ApiError, Result};
use crate::types::{AuthResponse, Envelope, LoginRequest, RegisterRequest, User, UserPayload};

use super::token::AccessToken;

/// Session facade: login, registration, logout and the current user.
///
/// All I/O decisions (printing, prompting, exit codes) belong to the caller.
/// `AuthService` only returns typed results and errors.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use quill::auth::AuthService;
/// use quill::client::AuthenticatedClient;
/// use quill::config::ClientConfig;
///
/// # async fn example() -> quill::error::Result<()> {
/// let client = Arc::new(AuthenticatedClient::from_config(&ClientConfig::from_env()?)?);
/// let auth = AuthService::new(client);
/// let user = auth.login("ada@example.com", "hunter22").await?;
/// println!("logged in as {}", user.name);
/// # Ok(())
/// # }
/// ```
pub struct AuthService<T: Transport> {
    client: Arc<AuthenticatedClient<T>>,
}

impl<T: Transport> Clone for AuthService<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<T: Transport> AuthService<T> {
    pub fn new(client: Arc<AuthenticatedClient<T>>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<AuthenticatedClient<T>> {
        &self.client
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.tokens().is_authenticated()
    }

    /// Exchange credentials for an access token and remember the user.
    ///
    /// A 401 here means bad credentials; it never triggers a token refresh.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = ApiRequest::post("/auth/login").with_json(&body)?.without_refresh();
        self.start_session(request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<User> {
        if request.password != request.password_confirm {
            return Err(ApiError::InvalidArgument(
                "password and confirmation do not match".to_string(),
            ));
        }
        let request = ApiRequest::post("/auth/register")
            .with_json(request)?
            .without_refresh();
        self.start_session(request).await
    }

    /// End the session. The backend call is best effort; local state is
    /// always cleared.
    pub async fn logout(&self) {
        let request = ApiRequest::post("/auth/logout").without_refresh();
        if let Err(err) = self.client.send(request).await {
            tracing::warn!(error = %err, "Backend logout failed; clearing local session anyway");
        }
        self.client.clear_session();
        tracing::info!("Logged out");
    }

    /// The logged-in user, or `None` when there is no usable session.
    ///
    /// Served from the cache while fresh. A 401 that survives the refresh
    /// clears the stored token and yields `None`; other errors propagate.
    pub async fn current_user(&self) -> Result<Option<User>> {
        if !self.is_authenticated() {
            return Ok(None);
        }
        let key = QueryKey::current_user();
        if let Some(user) = self.client.cache().get_fresh::<User>(&key) {
            return Ok(Some(user));
        }
        match self.client.get_json::<Envelope<UserPayload>>("/auth/me").await {
            Ok(envelope) => {
                let user = envelope.data.user;
                self.client.cache().set(key, &user)?;
                Ok(Some(user))
            }
            Err(ApiError::Unauthorized(message)) => {
                tracing::debug!(%message, "Current user request rejected; dropping token");
                self.forget_token();
                Ok(None)
            }
            Err(ApiError::RefreshFailed { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Rebuild the session from the refresh cookie, e.g. at startup.
    ///
    /// Returns `None` when the server has no session for this client.
    pub async fn restore_session(&self) -> Result<Option<User>> {
        match self.client.refresh_session().await {
            Ok(_) => self.current_user().await,
            Err(ApiError::RefreshFailed { status, message }) => {
                tracing::debug!(?status, %message, "No session to restore");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn start_session(&self, request: ApiRequest) -> Result<User> {
        let path = request.path.clone();
        let response: AuthResponse = self.client.send(request).await?.json()?;
        let token = AccessToken::new(response.access_token.clone());
        if token.is_empty() {
            return Err(ApiError::InvalidState(format!(
                "{path} returned an empty access token"
            )));
        }
        let user = response
            .user()
            .cloned()
            .ok_or_else(|| ApiError::InvalidState(format!("{path} returned no user")))?;
        self.client.replace_session(token)?;
        let cache = self.client.cache();
        cache.set(QueryKey::current_user(), &user)?;
        cache.invalidate_where(|key| {
            key.starts_with(&QueryKey::articles()) || key.starts_with(&QueryKey::users())
        });
        tracing::info!(user = %user.id, "Session started");
        Ok(user)
    }

    fn forget_token(&self) {
        if let Err(err) = self.client.tokens().clear() {
            tracing::warn!(error = %err, "Failed to clear persisted access token");
        }
        self.client.cache().remove(&QueryKey::current_user());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenStore;
    use crate::client::HttpTransport;
    use crate::config::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_json() -> serde_json::Value {
        json!({
            "_id": "u1",
            "name": "Ada",
            "email": "ada@example.com",
            "role": "user",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        })
    }

    fn service(server: &MockServer, token: Option<&str>) -> AuthService<HttpTransport> {
        let transport = HttpTransport::new(ClientConfig::new(server.uri())).unwrap();
        let tokens = TokenStore::in_memory();
        if let Some(token) = token {
            tokens.set(AccessToken::new(token)).unwrap();
        }
        AuthService::new(Arc::new(AuthenticatedClient::new(transport, Arc::new(tokens))))
    }

    #[tokio::test]
    async fn current_user_without_token_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/auth/me"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let svc = service(&server, None);
        assert!(svc.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn login_stores_token_and_seeds_current_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "accessToken": "t1",
                "data": {"user": user_json()}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/auth/me"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let svc = service(&server, None);
        let user = svc.login("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(svc.client().tokens().get(), Some(AccessToken::new("t1")));
        let cached = svc.current_user().await.unwrap().unwrap();
        assert_eq!(cached.email, "ada@example.com");
    }

    #[tokio::test]
    async fn register_rejects_mismatched_confirmation() {
        let server = MockServer::start().await;
        let svc = service(&server, None);
        let request = RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "one".into(),
            password_confirm: "two".into(),
        };
        let err = svc.register(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn logout_clears_session_even_when_backend_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/logout"))
            .and(header("authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        let svc = service(&server, Some("t1"));
        svc.client()
            .cache()
            .set(QueryKey::current_user(), &user_json())
            .unwrap();

        svc.logout().await;
        assert!(!svc.is_authenticated());
        assert!(!svc.client().cache().contains(&QueryKey::current_user()));
    }
}
