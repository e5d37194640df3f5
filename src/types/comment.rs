use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::AuthorSummary;

/// A comment with its nested replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    pub author: AuthorSummary,
    /// Id of the article the comment belongs to.
    pub article: String,
    #[serde(default)]
    pub replies: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_owner: Option<bool>,
}

/// Body of comment create/reply/update calls.
#[derive(Debug, Clone, Serialize)]
pub struct CommentText {
    pub text: String,
}

/// Response data of a comment or reply post; exactly one side is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentPayload {
    #[serde(default)]
    pub comment: Option<Comment>,
    #[serde(default)]
    pub reply: Option<Comment>,
}

impl CommentPayload {
    pub fn into_comment(self) -> Option<Comment> {
        self.comment.or(self.reply)
    }
}

/// Helpers over reply trees.
pub mod thread {
    use super::Comment;

    /// Number of comments in `comments`, replies included.
    pub fn total_count(comments: &[Comment]) -> usize {
        comments
            .iter()
            .map(|comment| 1 + total_count(&comment.replies))
            .sum()
    }

    /// Depth-first flattening; top-level comments have depth 0.
    pub fn flatten(comments: &[Comment]) -> Vec<(usize, &Comment)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, &Comment)> =
            comments.iter().rev().map(|comment| (0, comment)).collect();
        while let Some((depth, comment)) = stack.pop() {
            out.push((depth, comment));
            stack.extend(comment.replies.iter().rev().map(|reply| (depth + 1, reply)));
        }
        out
    }

    /// Find a comment anywhere in the tree.
    pub fn find<'a>(comments: &'a [Comment], id: &str) -> Option<&'a Comment> {
        comments.iter().find_map(|comment| {
            if comment.id == id {
                Some(comment)
            } else {
                find(&comment.replies, id)
            }
        })
    }
}
