//! Convenience re-exports for common use.

pub use crate::auth::{AccessToken, AuthService, Navigator, TokenStore};
pub use crate::cache::{QueryCache, QueryKey};
pub use crate::client::{ApiRequest, AuthenticatedClient, HttpTransport, Transport};
pub use crate::config::ClientConfig;
pub use crate::error::{ApiError, Result};
pub use crate::services::Services;
pub use crate::types::{
    ArticleDraft, ArticleFull, ArticleListItem, ArticleQuery, ArticleSort, Comment, Paginated,
    User,
};
