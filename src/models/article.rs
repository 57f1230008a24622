//! Article model
//!
//! Articles are the aggregate root of the blog: each one has exactly one
//! author, any number of tags and owns its comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Comment, Tag, TagCheckbox, TagSelection};

/// Maximum title length in characters
pub const MAX_TITLE_LENGTH: usize = 100;

/// Maximum content length in characters
pub const MAX_CONTENT_LENGTH: usize = 1000;

/// Article entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Owning user
    pub author_id: i64,
    /// Number of times the article was opened
    pub view_count: i64,
    /// Optimistic concurrency token, bumped on every edit
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Create a new, unsaved article.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(title: String, content: String, author_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title,
            content,
            author_id,
            view_count: 0,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The part of a user shown next to their articles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Article with its author, tags and comments loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    /// `None` only if the author row disappeared underneath us
    pub author: Option<AuthorSummary>,
    pub tags: Vec<Tag>,
    pub comments: Vec<Comment>,
}

impl ArticleDetail {
    /// Email of the author, used by the `Author` sort key
    pub fn author_email(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.email.as_str())
    }

    /// Tag names joined for display, e.g. `"rust, web"`
    pub fn tag_names(&self) -> String {
        self.tags
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Input for creating an article.
///
/// Only checked tags are attached, and only if a tag with that label
/// already exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleInput {
    pub title: String,
    pub content: String,
    pub author_id: i64,
    #[serde(default)]
    pub tags: Vec<TagCheckbox>,
}

impl CreateArticleInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>, author_id: i64) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            author_id,
            tags: Vec::new(),
        }
    }

    /// Builder method to add a tag checkbox
    pub fn with_tag(mut self, label: impl Into<String>, is_checked: bool) -> Self {
        self.tags.push(TagCheckbox {
            id: 0,
            label_name: label.into(),
            is_checked,
        });
        self
    }
}

/// Edit form for an article.
///
/// Returned by the edit view with every known tag listed, and accepted back
/// as the update body. Tags missing from `tags` are left as they are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditArticleRequest {
    pub article_id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<TagSelection>,
    /// Version the form was loaded at; when absent the current version is assumed
    #[serde(default)]
    pub version: Option<i64>,
}

/// Ordering applied to article listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Title, ascending
    Title,
    /// Author email, ascending
    Author,
    /// Creation time, newest first
    #[default]
    DateCreation,
}

impl From<&str> for SortKey {
    /// Unknown keys fall back to `DateCreation`.
    fn from(key: &str) -> Self {
        if key.eq_ignore_ascii_case("title") {
            SortKey::Title
        } else if key.eq_ignore_ascii_case("author") {
            SortKey::Author
        } else {
            SortKey::DateCreation
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Title => write!(f, "Title"),
            SortKey::Author => write!(f, "Author"),
            SortKey::DateCreation => write!(f, "DateCreation"),
        }
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 5,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Number of items skipped before this page
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.per_page as usize)
    }

    /// Get the page size
    pub fn limit(&self) -> usize {
        self.per_page as usize
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Slice one page out of an already ordered list.
    pub fn from_vec(all: Vec<T>, params: &ListParams) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(params.offset())
            .take(params.limit())
            .collect();
        Self::new(items, total, params)
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        ((self.total + per_page - 1) / per_page) as u32
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Convert the items while keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}
