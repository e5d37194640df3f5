use std::sync::Arc;

use futures::stream::BoxStream;

use crate::cache::QueryKey;
use crate::client::{ApiRequest, AuthenticatedClient, Transport};
use crate::error::{ApiError, Result};
use crate::pagination::paginate;
use crate::types::{Comment, CommentPayload, CommentText, Envelope, Paginated};

/// Comments requested per page.
pub const COMMENTS_PAGE_SIZE: u32 = 10;

/// Comment threads of an article.
///
/// Every mutation takes the owning article id so the right comment lists
/// can be invalidated.
pub struct CommentService<T: Transport> {
    client: Arc<AuthenticatedClient<T>>,
}

impl<T: Transport> Clone for CommentService<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<T: Transport> CommentService<T> {
    pub fn new(client: Arc<AuthenticatedClient<T>>) -> Self {
        Self { client }
    }

    pub async fn list(&self, article_id: &str, page: u32) -> Result<Paginated<Comment>> {
        let key = QueryKey::comment_lists(article_id).child(page.to_string());
        if let Some(cached) = self.client.cache().get_fresh(&key) {
            return Ok(cached);
        }
        let request = ApiRequest::get(format!("/articles/{article_id}/comments"))
            .with_query_param("page", page)
            .with_query_param("limit", COMMENTS_PAGE_SIZE);
        let comments: Paginated<Comment> = self.client.send(request).await?.json()?;
        self.client.cache().set(key, &comments)?;
        Ok(comments)
    }

    pub async fn post(&self, article_id: &str, text: &str) -> Result<Comment> {
        let path = format!("/articles/{article_id}/comments");
        self.write(article_id, ApiRequest::post(path), text).await
    }

    pub async fn reply(&self, article_id: &str, comment_id: &str, text: &str) -> Result<Comment> {
        let path = format!("/comments/{comment_id}/replies");
        self.write(article_id, ApiRequest::post(path), text).await
    }

    pub async fn update(&self, article_id: &str, comment_id: &str, text: &str) -> Result<Comment> {
        let path = format!("/comments/{comment_id}");
        self.write(article_id, ApiRequest::patch(path), text).await
    }

    pub async fn delete(&self, article_id: &str, comment_id: &str) -> Result<()> {
        self.client.delete(&format!("/comments/{comment_id}")).await?;
        self.invalidate(article_id);
        Ok(())
    }

    async fn write(&self, article_id: &str, request: ApiRequest, text: &str) -> Result<Comment> {
        if text.trim().is_empty() {
            return Err(ApiError::InvalidArgument("comment text is empty".to_string()));
        }
        let body = CommentText {
            text: text.to_string(),
        };
        let path = request.path.clone();
        let envelope: Envelope<CommentPayload> =
            self.client.send(request.with_json(&body)?).await?.json()?;
        self.invalidate(article_id);
        envelope
            .data
            .into_comment()
            .ok_or_else(|| ApiError::InvalidState(format!("{path} returned no comment")))
    }

    fn invalidate(&self, article_id: &str) {
        let cache = self.client.cache();
        cache.invalidate(&QueryKey::comment_lists(article_id));
        cache.invalidate(&QueryKey::my_comments());
    }
}

impl<T: Transport + 'static> CommentService<T> {
    /// Every page of an article's comments.
    pub fn stream(&self, article_id: &str) -> BoxStream<'static, Result<Paginated<Comment>>> {
        let service = self.clone();
        let article_id = article_id.to_string();
        paginate(1, move |page| {
            let service = service.clone();
            let article_id = article_id.clone();
            async move { service.list(&article_id, page).await }
        })
    }
}
