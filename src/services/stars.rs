use std::sync::Arc;

use crate::cache::QueryKey;
use crate::client::{ApiRequest, AuthenticatedClient, Transport};
use crate::error::{ApiError, Result};
use crate::types::{ArticleFull, Envelope, StarToggle, User};

/// Star toggling with an optimistic update of the cached article.
pub struct StarService<T: Transport> {
    client: Arc<AuthenticatedClient<T>>,
}

impl<T: Transport> StarService<T> {
    pub fn new(client: Arc<AuthenticatedClient<T>>) -> Self {
        Self { client }
    }

    /// Star or unstar `article_id` for the current user.
    ///
    /// The cached detail entry flips immediately. It is reconciled with the
    /// server's answer on success and restored on failure. Requires the
    /// current user to be known (see [`crate::auth::AuthService::current_user`]).
    pub async fn toggle(&self, article_id: &str) -> Result<StarToggle> {
        let cache = self.client.cache();
        let user: User = cache
            .get(&QueryKey::current_user())
            .filter(|_| self.client.tokens().is_authenticated())
            .ok_or(ApiError::NotLoggedIn)?;

        let key = QueryKey::article_detail(article_id);
        let previous = cache.update::<ArticleFull, _>(&key, |article| article.toggle_star_for(&user.id))?;

        let request = ApiRequest::post(format!("/articles/{article_id}/star"));
        let result = match self.client.send(request).await {
            Ok(response) => response.json::<Envelope<StarToggle>>().map(|envelope| envelope.data),
            Err(err) => Err(err),
        };
        match result {
            Ok(toggle) => {
                cache.update::<ArticleFull, _>(&key, |article| {
                    article.apply_star_result(&user.id, toggle.starred, toggle.new_count)
                })?;
                cache.invalidate(&QueryKey::article_lists());
                cache.invalidate(&QueryKey::my_starred_articles());
                tracing::debug!(article = %article_id, starred = toggle.starred, "Star toggled");
                Ok(toggle)
            }
            Err(err) => {
                if let Some(previous) = previous {
                    if let Err(rollback) = cache.set(key, &previous) {
                        tracing::warn!(error = %rollback, "Could not roll back star toggle");
                    }
                }
                Err(err)
            }
        }
    }
}
