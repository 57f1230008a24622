//! Tag model
//!
//! Tags are managed on their own and attached to articles by name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum tag name length in characters
pub const MAX_TAG_NAME_LENGTH: usize = 20;

/// Tag entity. Names are unique across the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Tag name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new Tag with the given name.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(name: String) -> Self {
        Self {
            id: 0,
            name,
            created_at: Utc::now(),
        }
    }
}

/// Tag with the number of articles carrying it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub article_count: i64,
}

impl TagWithCount {
    pub fn new(tag: Tag, article_count: i64) -> Self {
        Self { tag, article_count }
    }
}

/// Checkbox entry on the new-article form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagCheckbox {
    #[serde(default)]
    pub id: i64,
    pub label_name: String,
    pub is_checked: bool,
}

impl From<Tag> for TagCheckbox {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            label_name: tag.name,
            is_checked: false,
        }
    }
}

/// Selection entry on the article edit form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagSelection {
    #[serde(default)]
    pub tag_id: i64,
    pub name: String,
    pub is_selected: bool,
}

impl TagSelection {
    pub fn new(tag_id: i64, name: impl Into<String>, is_selected: bool) -> Self {
        Self {
            tag_id,
            name: name.into(),
            is_selected,
        }
    }

    /// Entry for a tag, flagged as selected or not
    pub fn from_tag(tag: &Tag, is_selected: bool) -> Self {
        Self::new(tag.id, tag.name.clone(), is_selected)
    }
}
