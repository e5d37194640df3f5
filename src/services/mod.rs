//! Typed resource services over [`AuthenticatedClient`].
//!
//! Each service owns a shared handle to the client and keeps the query cache
//! consistent with the mutations it performs.

pub mod articles;
pub mod categories;
pub mod comments;
pub mod stars;
pub mod tags;
pub mod users;

pub use articles::ArticleService;
pub use categories::CategoryService;
pub use comments::{CommentService, COMMENTS_PAGE_SIZE};
pub use stars::StarService;
pub use tags::TagService;
pub use users::UserService;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthService;
use crate::client::{AuthenticatedClient, Transport};

/// Freshness window for slow-moving taxonomy lists (tags, categories).
pub const TAXONOMY_STALE_TIME: Duration = Duration::from_secs(60 * 60);

/// Every service, sharing one client, token store and cache.
pub struct Services<T: Transport> {
    pub auth: AuthService<T>,
    pub articles: ArticleService<T>,
    pub comments: CommentService<T>,
    pub stars: StarService<T>,
    pub tags: TagService<T>,
    pub categories: CategoryService<T>,
    pub users: UserService<T>,
}

impl<T: Transport> Services<T> {
    pub fn new(client: Arc<AuthenticatedClient<T>>) -> Self {
        Self {
            auth: AuthService::new(Arc::clone(&client)),
            articles: ArticleService::new(Arc::clone(&client)),
            comments: CommentService::new(Arc::clone(&client)),
            stars: StarService::new(Arc::clone(&client)),
            tags: TagService::new(Arc::clone(&client)),
            categories: CategoryService::new(Arc::clone(&client)),
            users: UserService::new(client),
        }
    }
}
