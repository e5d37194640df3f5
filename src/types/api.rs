use serde::{Deserialize, Serialize};

use super::user::User;

/// Standard `{ status, data }` response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    /// Item count, present on some list endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<u32>,
    pub data: T,
}

/// `data` of endpoints that return a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    pub user: User,
}

/// Response of login, register and refresh-token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub status: String,
    pub access_token: String,
    #[serde(default)]
    pub data: Option<UserPayload>,
}

impl AuthResponse {
    pub fn user(&self) -> Option<&User> {
        self.data.as_ref().map(|payload| &payload.user)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: u32,
    pub items_per_page: u32,
    pub total_items: u32,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// One page of a paginated list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub pagination: PaginationInfo,
    pub data: Vec<T>,
}

impl<T> Paginated<T> {
    /// Page number to request after this one, if any.
    pub fn next_page(&self) -> Option<u32> {
        self.pagination
            .has_next_page
            .then(|| self.pagination.current_page + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(current: u32, has_next: bool) -> Paginated<u32> {
        Paginated {
            pagination: PaginationInfo {
                current_page: current,
                items_per_page: 10,
                total_items: 25,
                total_pages: 3,
                has_next_page: has_next,
                has_prev_page: current > 1,
            },
            data: vec![],
        }
    }

    #[test]
    fn next_page_follows_has_next_page() {
        assert_eq!(page(1, true).next_page(), Some(2));
        assert_eq!(page(3, false).next_page(), None);
    }

    #[test]
    fn auth_response_parses_user_and_token() {
        let raw = r#"{
            "status": "success",
            "accessToken": "t1",
            "data": {"user": {
                "_id": "u1", "name": "Ada", "email": "ada@example.com", "role": "admin",
                "createdAt": "2025-01-01T00:00:00Z", "updatedAt": "2025-01-02T00:00:00Z"
            }}
        }"#;
        let parsed: AuthResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.access_token, "t1");
        let user = parsed.user().unwrap();
        assert_eq!(user.role, crate::types::Role::Admin);
        assert!(user.avatar_url.is_none());
    }

    #[test]
    fn refresh_response_may_omit_user() {
        let parsed: AuthResponse =
            serde_json::from_str(r#"{"status":"success","accessToken":"t2"}"#).unwrap();
        assert!(parsed.user().is_none());
    }
}
