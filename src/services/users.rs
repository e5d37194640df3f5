use std::sync::Arc;

use crate::cache::QueryKey;
use crate::client::{ApiRequest, AuthenticatedClient, MultipartBody, RequestBody, Transport};
use crate::error::Result;
use crate::types::{ArticleListItem, Comment, CoverImage, Envelope, ProfileUpdate, User, UserPayload};

/// Profiles, and the current user's own comments and stars.
pub struct UserService<T: Transport> {
    client: Arc<AuthenticatedClient<T>>,
}

impl<T: Transport> UserService<T> {
    pub fn new(client: Arc<AuthenticatedClient<T>>) -> Self {
        Self { client }
    }

    pub async fn get(&self, user_id: &str) -> Result<User> {
        let key = QueryKey::user_detail(user_id);
        if let Some(user) = self.client.cache().get_fresh(&key) {
            return Ok(user);
        }
        let envelope: Envelope<UserPayload> = self.client.get_json(&format!("/users/{user_id}")).await?;
        self.client.cache().set(key, &envelope.data.user)?;
        Ok(envelope.data.user)
    }

    pub async fn update_me(&self, update: &ProfileUpdate) -> Result<User> {
        let envelope: Envelope<UserPayload> = self.client.patch_json("/users/me", update).await?;
        self.remember(envelope.data.user)
    }

    /// Upload a new avatar (multipart field `avatar`).
    pub async fn update_avatar(&self, image: &CoverImage) -> Result<User> {
        let body = MultipartBody::new().file(
            "avatar",
            image.file_name.clone(),
            image.mime.clone(),
            image.bytes.clone(),
        );
        let request = ApiRequest::patch("/users/me/avatar").with_body(RequestBody::Multipart(body));
        let envelope: Envelope<UserPayload> = self.client.send(request).await?.json()?;
        self.remember(envelope.data.user)
    }

    pub async fn my_comments(&self) -> Result<Vec<Comment>> {
        let key = QueryKey::my_comments();
        if let Some(comments) = self.client.cache().get_fresh(&key) {
            return Ok(comments);
        }
        let envelope: Envelope<Vec<Comment>> = self.client.get_json("/users/me/comments").await?;
        self.client.cache().set(key, &envelope.data)?;
        Ok(envelope.data)
    }

    pub async fn my_starred_articles(&self) -> Result<Vec<ArticleListItem>> {
        let key = QueryKey::my_starred_articles();
        if let Some(articles) = self.client.cache().get_fresh(&key) {
            return Ok(articles);
        }
        let envelope: Envelope<Vec<ArticleListItem>> =
            self.client.get_json("/users/me/starred-articles").await?;
        self.client.cache().set(key, &envelope.data)?;
        Ok(envelope.data)
    }

    fn remember(&self, user: User) -> Result<User> {
        let cache = self.client.cache();
        cache.set(QueryKey::current_user(), &user)?;
        cache.invalidate(&QueryKey::user_detail(&user.id));
        Ok(user)
    }
}
