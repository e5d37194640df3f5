use std::fmt;

use crate::types::ArticleQuery;

/// Hierarchical cache key, e.g. `articles/detail/42`.
///
/// Keys form a tree so a whole branch can be invalidated by prefix:
/// invalidating `articles/list` marks every filtered article list stale
/// without touching `articles/detail/*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Extend this key with one more segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn contains_segment(&self, segment: &str) -> bool {
        self.0.iter().any(|s| s == segment)
    }

    pub fn articles() -> Self {
        Self::new(["articles"])
    }

    pub fn article_lists() -> Self {
        Self::articles().child("list")
    }

    /// One filtered list; the filters are folded into a single segment.
    pub fn article_list(query: &ArticleQuery) -> Self {
        let filters = serde_json::to_string(query).unwrap_or_default();
        Self::article_lists().child(filters)
    }

    pub fn article_details() -> Self {
        Self::articles().child("detail")
    }

    pub fn article_detail(id: &str) -> Self {
        Self::article_details().child(id)
    }

    pub fn comments(article_id: &str) -> Self {
        Self::new(["comments", article_id])
    }

    pub fn comment_lists(article_id: &str) -> Self {
        Self::comments(article_id).child("list")
    }

    pub fn auth() -> Self {
        Self::new(["auth"])
    }

    pub fn current_user() -> Self {
        Self::auth().child("me")
    }

    pub fn users() -> Self {
        Self::new(["users"])
    }

    pub fn user_detail(user_id: &str) -> Self {
        Self::users().child("detail").child(user_id)
    }

    pub fn my_comments() -> Self {
        Self::users().child("me").child("comments")
    }

    pub fn my_starred_articles() -> Self {
        Self::users().child("me").child("starred")
    }

    pub fn tags() -> Self {
        Self::new(["tags"])
    }

    pub fn tag_lists() -> Self {
        Self::tags().child("list")
    }

    pub fn categories() -> Self {
        Self::new(["categories"])
    }

    pub fn category_lists() -> Self {
        Self::categories().child("list")
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}
