#![allow(dead_code)]

use std::sync::Arc;

use quill::auth::{AccessToken, MemoryTokenStorage, RouteTracker, TokenStore};
use quill::client::{AuthenticatedClient, HttpTransport};
use quill::config::ClientConfig;
use quill::services::Services;
use serde_json::{json, Value};
use wiremock::{Match, Request};

pub const REFRESH: &str = "/api/v1/auth/refresh-token";

pub struct Harness {
    pub client: Arc<AuthenticatedClient<HttpTransport>>,
    pub storage: Arc<MemoryTokenStorage>,
    pub navigator: Arc<RouteTracker>,
}

impl Harness {
    pub fn services(&self) -> Services<HttpTransport> {
        Services::new(Arc::clone(&self.client))
    }

    pub fn token(&self) -> Option<String> {
        self.client.tokens().get().map(|t| t.as_str().to_string())
    }
}

/// Client against `server`, optionally holding `token`, sitting on `route`.
pub fn harness(server_uri: &str, token: Option<&str>, route: &str) -> Harness {
    let storage = Arc::new(match token {
        Some(token) => MemoryTokenStorage::with_token(AccessToken::new(token)),
        None => MemoryTokenStorage::new(),
    });
    let tokens = TokenStore::load(storage.clone()).expect("load tokens");
    let navigator = Arc::new(RouteTracker::new(route));
    let transport = HttpTransport::new(ClientConfig::new(server_uri)).expect("transport");
    let client = AuthenticatedClient::new(transport, Arc::new(tokens)).with_navigator(navigator.clone());
    Harness {
        client: Arc::new(client),
        storage,
        navigator,
    }
}

/// Matches requests that carry no `Authorization` header.
pub struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

pub fn user_json(id: &str) -> Value {
    json!({
        "_id": id,
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "role": "user",
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    })
}

pub fn auth_response(token: &str, user_id: &str) -> Value {
    json!({
        "status": "success",
        "accessToken": token,
        "data": {"user": user_json(user_id)}
    })
}

fn author() -> Value {
    json!({"_id": "u9", "name": "Grace Hopper"})
}

fn category() -> Value {
    json!({"_id": "c1", "name": "Systems"})
}

pub fn article_list_item(id: &str, title: &str) -> Value {
    json!({
        "_id": id,
        "title": title,
        "summary": "summary",
        "author": author(),
        "category": category(),
        "readTimeInMinutes": 4,
        "tags": [{"_id": "t1", "name": "rust"}],
        "commentCount": 0,
        "starsCount": 2,
        "createdAt": "2024-02-01T00:00:00Z",
        "updatedAt": "2024-02-01T00:00:00Z"
    })
}

pub fn article_full(id: &str, starred_by: &[&str]) -> Value {
    json!({
        "_id": id,
        "title": "Pinning in practice",
        "summary": "summary",
        "content": "<p>body</p>",
        "author": author(),
        "category": category(),
        "readTimeInMinutes": 7,
        "tags": [],
        "comments": [],
        "commentCount": 0,
        "starredBy": starred_by,
        "starsCount": starred_by.len(),
        "createdAt": "2024-02-01T00:00:00Z",
        "updatedAt": "2024-02-01T00:00:00Z"
    })
}

pub fn page(items: Vec<Value>, current: u32, total_pages: u32) -> Value {
    json!({
        "pagination": {
            "currentPage": current,
            "itemsPerPage": 10,
            "totalItems": items.len(),
            "totalPages": total_pages,
            "hasNextPage": current < total_pages,
            "hasPrevPage": current > 1
        },
        "data": items
    })
}

pub fn comment_json(id: &str, text: &str, replies: Vec<Value>) -> Value {
    json!({
        "_id": id,
        "text": text,
        "author": author(),
        "article": "a1",
        "replies": replies,
        "createdAt": "2024-02-02T00:00:00Z",
        "updatedAt": "2024-02-02T00:00:00Z"
    })
}
