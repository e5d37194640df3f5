//! Authenticated API client.
//!
//! [`AuthenticatedClient`] decorates a base [`Transport`]: it attaches the
//! bearer token, and on a 401 it refreshes the token once (shared across all
//! concurrent callers) and replays the request. A failed refresh clears the
//! session, drops the cached current user and redirects to the login route.

pub mod refresh;
pub mod transport;

pub use refresh::{RefreshCoordinator, RefreshFailure, RefreshOutcome, RefreshTicket};
pub use transport::{
    status_to_error, ApiRequest, ApiResponse, HttpTransport, MultipartBody, RequestBody,
    Transport,
};

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{AccessToken, Navigator, NoopNavigator, TokenStore};
use crate::cache::{QueryCache, QueryKey};
use crate::config::{ClientConfig, DEFAULT_LOGIN_ROUTE};
use crate::error::{ApiError, Result};
use crate::types::{AuthResponse, User};

/// Path of the token refresh endpoint, relative to the API prefix.
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// Whether `path` targets the refresh endpoint (query string ignored).
pub fn is_refresh_path(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    path.trim_end_matches('/') == REFRESH_PATH
}

/// Per-request state that travels with one logical request across attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Token attached to the current attempt.
    pub token: Option<AccessToken>,
    /// Set once the request has been replayed after a refresh.
    pub retried: bool,
}

impl RequestContext {
    pub fn first_attempt(token: Option<AccessToken>) -> Self {
        Self {
            token,
            retried: false,
        }
    }

    /// Context for the single replay. Queued callers get the same marker as
    /// the caller that ran the refresh.
    pub fn replay_with(&self, token: AccessToken) -> Self {
        Self {
            token: Some(token),
            retried: true,
        }
    }

    /// A 401 on this attempt may trigger a refresh.
    pub fn may_refresh(&self, request: &ApiRequest) -> bool {
        request.refreshable && !self.retried && !is_refresh_path(&request.path)
    }
}

/// API client with transparent access-token refresh.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use quill::auth::TokenStore;
/// use quill::client::{AuthenticatedClient, HttpTransport};
/// use quill::config::ClientConfig;
///
/// # async fn example() -> quill::error::Result<()> {
/// let config = ClientConfig::from_env()?;
/// let transport = HttpTransport::new(config)?;
/// let client = AuthenticatedClient::new(transport, Arc::new(TokenStore::in_memory()));
/// let tags: serde_json::Value = client.get_json("/tags").await?;
/// # Ok(())
/// # }
/// ```
pub struct AuthenticatedClient<T: Transport> {
    transport: T,
    tokens: Arc<TokenStore>,
    cache: Arc<QueryCache>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
    refresh: RefreshCoordinator,
}

impl AuthenticatedClient<HttpTransport> {
    /// HTTP client whose token store is hydrated from the configured session file.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let storage = Arc::new(crate::auth::FileTokenStorage::new(config.token_path().clone()));
        let tokens = TokenStore::load(storage)?;
        let transport = HttpTransport::new(config.clone())?;
        Ok(Self::new(transport, Arc::new(tokens)).with_login_route(config.login_route()))
    }
}

impl<T: Transport> AuthenticatedClient<T> {
    pub fn new(transport: T, tokens: Arc<TokenStore>) -> Self {
        Self {
            transport,
            tokens,
            cache: Arc::new(QueryCache::new()),
            navigator: Arc::new(NoopNavigator),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            refresh: RefreshCoordinator::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    /// Send a request, refreshing the token and replaying once on a 401.
    ///
    /// Non-401 error statuses come back as [`ApiError::Api`]; a 401 that
    /// survives the replay (or comes from the refresh endpoint itself) comes
    /// back as [`ApiError::Unauthorized`].
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut ctx = RequestContext::first_attempt(self.tokens.get());
        loop {
            let response = self.transport.send(&request, ctx.token.as_ref()).await?;
            if !response.is_unauthorized() {
                return response.error_for_status();
            }
            if !ctx.may_refresh(&request) {
                tracing::debug!(
                    path = %request.path,
                    retried = ctx.retried,
                    "401 is final; not refreshing"
                );
                return response.error_for_status();
            }
            let token = self.fresh_token(&ctx).await?;
            tracing::debug!(method = %request.method, path = %request.path, "Replaying request with refreshed token");
            ctx = ctx.replay_with(token);
        }
    }

    /// `request(method, path, body?)` in one call.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<ApiResponse> {
        let mut request = ApiRequest::new(method, path);
        request.body = body;
        self.send(request).await
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        self.send(ApiRequest::post(path).with_json(body)?).await?.json()
    }

    pub async fn patch_json<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        self.send(ApiRequest::patch(path).with_json(body)?).await?.json()
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Explicitly refresh the session, sharing any refresh already in flight.
    ///
    /// Unlike a refresh triggered by a 401, a failure here clears the session
    /// without redirecting; callers use it to probe for a session at startup.
    pub async fn refresh_session(&self) -> Result<AccessToken> {
        match self.refresh.begin() {
            RefreshTicket::Leader(guard) => self.lead_refresh(guard, false).await,
            RefreshTicket::Queued(rx) => await_queued(rx).await,
            RefreshTicket::Current(token) => Ok(token),
        }
    }

    /// Forget the session locally: token, cached user, auth-dependent queries.
    ///
    /// A refresh still in flight is discarded when it returns.
    pub fn clear_session(&self) {
        self.refresh.end_session();
        if let Err(err) = self.tokens.clear() {
            tracing::warn!(error = %err, "Failed to clear persisted access token");
        }
        self.cache.remove(&QueryKey::current_user());
        self.cache.invalidate_where(|key| {
            key.starts_with(&QueryKey::auth())
                || key.starts_with(&QueryKey::users())
                || key.starts_with(&QueryKey::articles())
        });
    }

    /// Install a token obtained from login or registration.
    ///
    /// Supersedes any refresh in flight, which then cannot overwrite it.
    pub fn replace_session(&self, token: AccessToken) -> Result<()> {
        self.refresh.end_session();
        self.tokens.set(token)?;
        Ok(())
    }

    async fn fresh_token(&self, ctx: &RequestContext) -> Result<AccessToken> {
        match self.refresh.join(ctx.token.as_ref(), &self.tokens) {
            RefreshTicket::Current(token) => Ok(token),
            RefreshTicket::Queued(rx) => await_queued(rx).await,
            RefreshTicket::Leader(guard) => self.lead_refresh(guard, true).await,
        }
    }

    async fn lead_refresh(
        &self,
        guard: refresh::RefreshGuard<'_>,
        redirect_on_failure: bool,
    ) -> Result<AccessToken> {
        tracing::info!("Access token rejected; refreshing session");
        let mut superseded = false;
        let outcome = match self.call_refresh_endpoint().await {
            Ok((token, user)) => {
                let committed = guard.commit(|| {
                    if let Err(err) = self.tokens.set(token.clone()) {
                        tracing::warn!(error = %err, "Refreshed token could not be persisted");
                    }
                    if let Some(user) = &user {
                        if let Err(err) = self.cache.set(QueryKey::current_user(), user) {
                            tracing::debug!(error = %err, "Could not cache refreshed user");
                        }
                    }
                });
                if committed {
                    tracing::info!(queued = self.refresh.queued(), "Session refreshed");
                    Ok(token)
                } else {
                    superseded = true;
                    tracing::info!("Session ended during refresh; discarding refreshed token");
                    Err(RefreshFailure::new(
                        None,
                        "session ended while the token refresh was in flight",
                    ))
                }
            }
            Err(failure) => {
                tracing::warn!(
                    status = ?failure.status,
                    message = %failure.message,
                    "Session refresh failed; logging out"
                );
                superseded = !guard.commit(|| {
                    if let Err(err) = self.tokens.clear() {
                        tracing::warn!(error = %err, "Failed to clear persisted access token");
                    }
                });
                Err(failure)
            }
        };
        guard.settle(&outcome);
        if outcome.is_err() && !superseded {
            self.enter_logged_out(redirect_on_failure);
        }
        outcome.map_err(ApiError::from)
    }

    async fn call_refresh_endpoint(&self) -> std::result::Result<(AccessToken, Option<User>), RefreshFailure> {
        let request = ApiRequest::post(REFRESH_PATH);
        let response = self
            .transport
            .send(&request, None)
            .await
            .map_err(|err| RefreshFailure::new(err.status(), err.to_string()))?;
        let status = response.status().as_u16();
        let response = response
            .error_for_status()
            .map_err(|err| RefreshFailure::new(Some(status), err.to_string()))?;
        let parsed: AuthResponse = response
            .json()
            .map_err(|err| RefreshFailure::new(Some(status), format!("invalid refresh response: {err}")))?;
        let user = parsed.user().cloned();
        let token = AccessToken::new(parsed.access_token);
        if token.is_empty() {
            return Err(RefreshFailure::new(Some(status), "refresh response had an empty access token"));
        }
        Ok((token, user))
    }

    fn enter_logged_out(&self, redirect: bool) {
        self.cache.remove(&QueryKey::current_user());
        if !redirect {
            return;
        }
        let route = self.navigator.current_route();
        if route != self.login_route {
            tracing::info!(from = %route, to = %self.login_route, "Redirecting to login");
            self.navigator.redirect(&self.login_route);
        }
    }
}

async fn await_queued(rx: tokio::sync::oneshot::Receiver<RefreshOutcome>) -> Result<AccessToken> {
    match rx.await {
        Ok(outcome) => outcome.map_err(ApiError::from),
        Err(_) => Err(ApiError::RefreshFailed {
            status: None,
            message: "token refresh ended without a result".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use crate::auth::RouteTracker;

    /// Transport that answers from a script and records what it was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<ApiResponse>>,
        sent: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedTransport {
        fn with(responses: Vec<(u16, &str)>) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|(status, body)| {
                            ApiResponse::new(StatusCode::from_u16(status).unwrap(), body)
                        })
                        .collect(),
                ),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<(String, Option<String>)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &ApiRequest, token: Option<&AccessToken>) -> Result<ApiResponse> {
            self.sent
                .lock()
                .unwrap()
                .push((request.path.clone(), token.map(|t| t.as_str().to_string())));
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request"))
        }
    }

    fn client(transport: ScriptedTransport, token: Option<&str>) -> AuthenticatedClient<ScriptedTransport> {
        let tokens = TokenStore::in_memory();
        if let Some(token) = token {
            tokens.set(AccessToken::new(token)).unwrap();
        }
        AuthenticatedClient::new(transport, Arc::new(tokens))
    }

    #[test]
    fn refresh_path_detection_ignores_query_and_trailing_slash() {
        assert!(is_refresh_path("/auth/refresh-token"));
        assert!(is_refresh_path("/auth/refresh-token/"));
        assert!(is_refresh_path("/auth/refresh-token?x=1"));
        assert!(!is_refresh_path("/auth/refresh"));
    }

    #[test]
    fn replay_context_is_marked_retried() {
        let ctx = RequestContext::first_attempt(None);
        let request = ApiRequest::get("/articles");
        assert!(ctx.may_refresh(&request));
        let replay = ctx.replay_with(AccessToken::new("t2"));
        assert!(replay.retried);
        assert!(!replay.may_refresh(&request));
        assert!(!ctx.may_refresh(&ApiRequest::post(REFRESH_PATH)));
    }

    #[tokio::test]
    async fn attaches_bearer_only_when_token_is_held() {
        let anon = client(ScriptedTransport::with(vec![(200, "{}")]), None);
        anon.send(ApiRequest::get("/tags")).await.unwrap();
        assert_eq!(anon.transport().sent(), vec![("/tags".to_string(), None)]);

        let authed = client(ScriptedTransport::with(vec![(200, "{}")]), Some("t1"));
        authed.send(ApiRequest::get("/tags")).await.unwrap();
        assert_eq!(
            authed.transport().sent(),
            vec![("/tags".to_string(), Some("t1".to_string()))]
        );
    }

    #[tokio::test]
    async fn refreshes_and_replays_once() {
        let transport = ScriptedTransport::with(vec![
            (401, r#"{"status":"fail","message":"jwt expired"}"#),
            (200, r#"{"status":"success","accessToken":"t2"}"#),
            (200, r#"{"ok":true}"#),
        ]);
        let client = client(transport, Some("t1"));
        let response = client.send(ApiRequest::get("/auth/me")).await.unwrap();
        assert_eq!(response.body(), r#"{"ok":true}"#);
        assert_eq!(client.tokens().get(), Some(AccessToken::new("t2")));
        assert_eq!(
            client.transport().sent(),
            vec![
                ("/auth/me".to_string(), Some("t1".to_string())),
                (REFRESH_PATH.to_string(), None),
                ("/auth/me".to_string(), Some("t2".to_string())),
            ]
        );
        assert!(!client.is_refreshing());
    }

    #[tokio::test]
    async fn second_401_after_replay_is_final() {
        let transport = ScriptedTransport::with(vec![
            (401, ""),
            (200, r#"{"status":"success","accessToken":"t2"}"#),
            (401, r#"{"status":"fail","message":"still no"}"#),
        ]);
        let client = client(transport, Some("t1"));
        let err = client.send(ApiRequest::get("/users/me/comments")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "still no"));
        assert_eq!(client.transport().sent().len(), 3);
    }

    #[tokio::test]
    async fn refresh_endpoint_401_never_refreshes_itself() {
        let transport = ScriptedTransport::with(vec![(401, "")]);
        let client = client(transport, Some("t1"));
        let err = client.send(ApiRequest::post(REFRESH_PATH)).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(client.transport().sent().len(), 1);
        // the token is untouched; only a failed refresh cycle clears it
        assert!(client.tokens().is_authenticated());
    }

    #[tokio::test]
    async fn failed_refresh_logs_out_and_redirects() {
        let transport = ScriptedTransport::with(vec![
            (401, ""),
            (401, r#"{"status":"fail","message":"refresh token expired"}"#),
        ]);
        let nav = Arc::new(RouteTracker::new("/articles/42"));
        let client = client(transport, Some("t1")).with_navigator(nav.clone());
        client
            .cache()
            .set(QueryKey::current_user(), &serde_json::json!({"name": "Ada"}))
            .unwrap();

        let err = client.send(ApiRequest::get("/articles/42")).await.unwrap_err();
        match err {
            ApiError::RefreshFailed { status, message } => {
                assert_eq!(status, Some(401));
                assert!(message.contains("refresh token expired"));
            }
            other => panic!("expected RefreshFailed, got {other:?}"),
        }
        assert!(!client.tokens().is_authenticated());
        assert!(!client.cache().contains(&QueryKey::current_user()));
        assert_eq!(nav.redirects(), vec!["/login".to_string()]);
    }

    #[tokio::test]
    async fn no_redirect_when_already_on_login() {
        let transport = ScriptedTransport::with(vec![(401, ""), (500, "down")]);
        let nav = Arc::new(RouteTracker::new("/login"));
        let client = client(transport, Some("t1")).with_navigator(nav.clone());
        let err = client.send(ApiRequest::get("/auth/me")).await.unwrap_err();
        assert!(matches!(err, ApiError::RefreshFailed { status: Some(500), .. }));
        assert!(nav.redirects().is_empty());
    }

    #[tokio::test]
    async fn opted_out_requests_surface_401_directly() {
        let transport = ScriptedTransport::with(vec![(401, r#"{"status":"fail","message":"Incorrect email or password"}"#)]);
        let client = client(transport, None);
        let request = ApiRequest::post("/auth/login").without_refresh();
        let err = client.send(request).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Incorrect email or password"));
        assert_eq!(client.transport().sent().len(), 1);
    }

    #[tokio::test]
    async fn explicit_refresh_failure_does_not_redirect() {
        let transport = ScriptedTransport::with(vec![(401, "")]);
        let nav = Arc::new(RouteTracker::new("/articles"));
        let client = client(transport, Some("t1")).with_navigator(nav.clone());
        let err = client.refresh_session().await.unwrap_err();
        assert!(matches!(err, ApiError::RefreshFailed { .. }));
        assert!(!client.tokens().is_authenticated());
        assert!(nav.redirects().is_empty());
    }

    #[tokio::test]
    async fn non_401_errors_pass_through_untouched() {
        let transport = ScriptedTransport::with(vec![(403, r#"{"status":"fail","message":"not yours"}"#)]);
        let client = client(transport, Some("t1"));
        let err = client.delete("/articles/1").await.unwrap_err();
        assert!(matches!(err, ApiError::Api { status: 403, .. }));
        assert_eq!(client.transport().sent().len(), 1);
        assert!(client.tokens().is_authenticated());
    }

    #[tokio::test]
    async fn stale_token_401_replays_without_refreshing() {
        // The request went out with t1 but the store already holds t2.
        let transport = ScriptedTransport::with(vec![(200, "{}")]);
        let client = client(transport, Some("t2"));
        let ctx = RequestContext::first_attempt(Some(AccessToken::new("t1")));
        let token = client.fresh_token(&ctx).await.unwrap();
        assert_eq!(token.as_str(), "t2");
        assert!(client.transport().sent().is_empty());
    }

    #[tokio::test]
    async fn clear_session_invalidates_auth_dependent_queries() {
        let client = client(ScriptedTransport::default(), Some("t1"));
        client.cache().set(QueryKey::current_user(), &"ada").unwrap();
        client.cache().set(QueryKey::article_detail("1"), &1).unwrap();
        client.cache().set(QueryKey::tag_lists(), &1).unwrap();
        client.clear_session();
        assert!(!client.tokens().is_authenticated());
        assert!(!client.cache().contains(&QueryKey::current_user()));
        assert!(client.cache().is_stale(&QueryKey::article_detail("1")));
        assert!(!client.cache().is_stale(&QueryKey::tag_lists()));
    }
}
