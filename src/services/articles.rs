use std::sync::Arc;

use futures::stream::BoxStream;

use crate::cache::QueryKey;
use crate::client::{ApiRequest, AuthenticatedClient, RequestBody, Transport};
use crate::error::Result;
use crate::pagination::paginate;
use crate::types::{ArticleDraft, ArticleFull, ArticleListItem, ArticleQuery, Paginated};

/// Articles: filtered lists, detail, and authoring.
pub struct ArticleService<T: Transport> {
    client: Arc<AuthenticatedClient<T>>,
}

impl<T: Transport> Clone for ArticleService<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<T: Transport> ArticleService<T> {
    pub fn new(client: Arc<AuthenticatedClient<T>>) -> Self {
        Self { client }
    }

    /// One page of articles matching `query`.
    pub async fn list(&self, query: &ArticleQuery) -> Result<Paginated<ArticleListItem>> {
        let key = QueryKey::article_list(query);
        if let Some(page) = self.client.cache().get_fresh(&key) {
            return Ok(page);
        }
        let request = ApiRequest::get("/articles").with_query(query)?;
        let page: Paginated<ArticleListItem> = self.client.send(request).await?.json()?;
        self.client.cache().set(key, &page)?;
        Ok(page)
    }

    pub async fn get(&self, article_id: &str) -> Result<ArticleFull> {
        let key = QueryKey::article_detail(article_id);
        if let Some(article) = self.client.cache().get_fresh(&key) {
            return Ok(article);
        }
        let article: ArticleFull = self.client.get_json(&format!("/articles/{article_id}")).await?;
        self.client.cache().set(key, &article)?;
        Ok(article)
    }

    pub async fn create(&self, draft: &ArticleDraft) -> Result<ArticleFull> {
        let request = ApiRequest::post("/articles")
            .with_body(RequestBody::Multipart(draft.to_multipart()));
        let article: ArticleFull = self.client.send(request).await?.json()?;
        self.remember(&article)?;
        tracing::info!(article = %article.id, "Article created");
        Ok(article)
    }

    pub async fn update(&self, article_id: &str, draft: &ArticleDraft) -> Result<ArticleFull> {
        let request = ApiRequest::patch(format!("/articles/{article_id}"))
            .with_body(RequestBody::Multipart(draft.to_multipart()));
        let article: ArticleFull = self.client.send(request).await?.json()?;
        self.remember(&article)?;
        Ok(article)
    }

    pub async fn delete(&self, article_id: &str) -> Result<()> {
        self.client.delete(&format!("/articles/{article_id}")).await?;
        let cache = self.client.cache();
        cache.remove(&QueryKey::article_detail(article_id));
        cache.invalidate(&QueryKey::article_lists());
        tracing::info!(article = %article_id, "Article deleted");
        Ok(())
    }

    fn remember(&self, article: &ArticleFull) -> Result<()> {
        let cache = self.client.cache();
        cache.set(QueryKey::article_detail(&article.id), article)?;
        cache.invalidate(&QueryKey::article_lists());
        Ok(())
    }
}

impl<T: Transport + 'static> ArticleService<T> {
    /// Every page of `query`, starting at its page (or the first).
    pub fn stream(&self, query: ArticleQuery) -> BoxStream<'static, Result<Paginated<ArticleListItem>>> {
        let service = self.clone();
        let first = query.page.unwrap_or(1);
        paginate(first, move |page| {
            let service = service.clone();
            let query = query.with_page(page);
            async move { service.list(&query).await }
        })
    }
}
