use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::comment::Comment;
use super::taxonomy::{Category, Tag};
use super::user::AuthorSummary;
use crate::client::MultipartBody;

/// Article as it appears in list views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    pub author: AuthorSummary,
    pub category: Category,
    pub read_time_in_minutes: u32,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub stars_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_owner: Option<bool>,
}

/// Fully populated article for the detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleFull {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub summary: String,
    /// Rendered HTML body.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    pub author: AuthorSummary,
    pub category: Category,
    pub read_time_in_minutes: u32,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub comment_count: u32,
    /// Ids of users who starred the article.
    #[serde(default)]
    pub starred_by: Vec<String>,
    #[serde(default)]
    pub stars_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_owner: Option<bool>,
}

impl ArticleFull {
    pub fn is_starred_by(&self, user_id: &str) -> bool {
        self.starred_by.iter().any(|id| id == user_id)
    }

    /// Flip `user_id`'s star locally, keeping `stars_count` in step.
    pub fn toggle_star_for(&mut self, user_id: &str) {
        if self.is_starred_by(user_id) {
            self.starred_by.retain(|id| id != user_id);
            self.stars_count = self.stars_count.saturating_sub(1);
        } else {
            self.starred_by.push(user_id.to_string());
            self.stars_count += 1;
        }
    }

    /// Apply the authoritative result of a star toggle.
    pub fn apply_star_result(&mut self, user_id: &str, starred: bool, count: u32) {
        self.starred_by.retain(|id| id != user_id);
        if starred {
            self.starred_by.push(user_id.to_string());
        }
        self.stars_count = count;
    }
}

/// Sort order for article lists.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArticleSort {
    #[default]
    Newest,
    Oldest,
    /// Most starred first.
    Stars,
}

/// Filters and paging for `GET /articles`.
///
/// # Example
/// ```
/// use quill::types::{ArticleQuery, ArticleSort};
///
/// let query = ArticleQuery::builder()
///     .page(2)
///     .sort(ArticleSort::Stars)
///     .search("rust")
///     .build();
/// assert_eq!(query.page, Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Builder, Serialize)]
pub struct ArticleQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<ArticleSort>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Category id.
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Tag id.
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ArticleQuery {
    /// Same filters, different page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }

    /// Same filters, no page. Used as the cache key of an infinite list.
    pub fn without_page(&self) -> Self {
        Self {
            page: None,
            ..self.clone()
        }
    }
}

/// Uploaded cover image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Create/update payload for an article, sent as multipart form data.
///
/// Every field is optional so the same type serves `PATCH`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
pub struct ArticleDraft {
    #[builder(into)]
    pub title: Option<String>,
    #[builder(into)]
    pub summary: Option<String>,
    #[builder(into)]
    pub content: Option<String>,
    /// Category id.
    #[builder(into)]
    pub category: Option<String>,
    /// Tag ids.
    pub tags: Option<Vec<String>>,
    pub cover_image: Option<CoverImage>,
}

impl ArticleDraft {
    /// Form fields; list values are JSON-encoded, as the API expects.
    pub fn to_multipart(&self) -> MultipartBody {
        let mut body = MultipartBody::new();
        let text_fields = [
            ("title", &self.title),
            ("summary", &self.summary),
            ("content", &self.content),
            ("category", &self.category),
        ];
        for (name, value) in text_fields {
            if let Some(value) = value {
                body = body.text(name, value.clone());
            }
        }
        if let Some(tags) = &self.tags {
            let encoded = serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string());
            body = body.text("tags", encoded);
        }
        if let Some(image) = &self.cover_image {
            body = body.file(
                "coverImage",
                image.file_name.clone(),
                image.mime.clone(),
                image.bytes.clone(),
            );
        }
        body
    }
}

/// Server answer to `POST /articles/{id}/star`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarToggle {
    pub starred: bool,
    pub new_count: u32,
}
