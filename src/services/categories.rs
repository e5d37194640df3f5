use std::sync::Arc;

use super::TAXONOMY_STALE_TIME;
use crate::cache::QueryKey;
use crate::client::{AuthenticatedClient, Transport};
use crate::error::Result;
use crate::types::{Category, Envelope};

pub struct CategoryService<T: Transport> {
    client: Arc<AuthenticatedClient<T>>,
}

impl<T: Transport> CategoryService<T> {
    pub fn new(client: Arc<AuthenticatedClient<T>>) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        let key = QueryKey::category_lists();
        if let Some(categories) = self.client.cache().get_within(&key, TAXONOMY_STALE_TIME) {
            return Ok(categories);
        }
        let envelope: Envelope<Vec<Category>> = self.client.get_json("/categories").await?;
        self.client.cache().set(key, &envelope.data)?;
        Ok(envelope.data)
    }
}
