//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum comment content length in characters
pub const MAX_COMMENT_LENGTH: usize = 200;

/// Maximum comment title length in characters
pub const MAX_COMMENT_TITLE_LENGTH: usize = 100;

/// Comment left by a user under an article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    /// Article this comment belongs to
    pub article_id: i64,
    /// User who wrote the comment
    pub author_id: i64,
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Create a new, unsaved comment
    pub fn new(article_id: i64, author_id: i64, title: Option<String>, content: String) -> Self {
        Self {
            id: 0,
            article_id,
            author_id,
            title,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Body of `POST /comments`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub article_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
}

/// Body of `PUT /comments/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditCommentRequest {
    pub comment_id: i64,
    pub article_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
}
