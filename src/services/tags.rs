use std::sync::Arc;

use serde::Serialize;

use super::TAXONOMY_STALE_TIME;
use crate::cache::QueryKey;
use crate::client::{AuthenticatedClient, Transport};
use crate::error::{ApiError, Result};
use crate::types::{Envelope, Tag};

#[derive(Serialize)]
struct NewTag<'a> {
    name: &'a str,
}

pub struct TagService<T: Transport> {
    client: Arc<AuthenticatedClient<T>>,
}

impl<T: Transport> TagService<T> {
    pub fn new(client: Arc<AuthenticatedClient<T>>) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Tag>> {
        let key = QueryKey::tag_lists();
        if let Some(tags) = self.client.cache().get_within(&key, TAXONOMY_STALE_TIME) {
            return Ok(tags);
        }
        let envelope: Envelope<Vec<Tag>> = self.client.get_json("/tags").await?;
        self.client.cache().set(key, &envelope.data)?;
        Ok(envelope.data)
    }

    pub async fn create(&self, name: &str) -> Result<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidArgument("tag name is empty".to_string()));
        }
        let envelope: Envelope<Tag> = self.client.post_json("/tags", &NewTag { name }).await?;
        self.client.cache().invalidate(&QueryKey::tag_lists());
        Ok(envelope.data)
    }
}
