//! Tag service
//!
//! Tags are created and renamed only here; articles merely attach
//! existing tags by name.

use crate::db::is_unique_violation;
use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagWithCount, MAX_TAG_NAME_LENGTH};
use anyhow::Context;
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A tag with this name already exists
    #[error("Tag name already exists: {0}")]
    DuplicateName(String),

    /// The store reported that nothing was updated
    #[error("Failed to update tag: {0}")]
    UpdateFailed(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service for managing blog tags
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    /// Create a new tag service
    ///
    /// # Arguments
    /// * `repo` - Tag repository for database operations
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// Insert a new tag.
    ///
    /// # Arguments
    /// * `name` - Tag name; surrounding whitespace is ignored
    ///
    /// # Errors
    /// - `ValidationError` if the name is empty or longer than 20 characters
    /// - `DuplicateName` if a tag with this name exists, whether found up
    ///   front or reported by the store's unique constraint
    pub async fn insert(&self, name: &str) -> Result<Tag, TagServiceError> {
        let name = validate_tag_name(name)?;

        if self
            .repo
            .exists_by_name(&name)
            .await
            .context("Failed to check existing tag")?
        {
            return Err(TagServiceError::DuplicateName(name));
        }

        match self.repo.create(&Tag::new(name.clone())).await {
            Ok(tag) => {
                tracing::info!(tag_id = tag.id, name = %tag.name, "Tag created");
                Ok(tag)
            }
            Err(e) if is_unique_violation(&e) => Err(TagServiceError::DuplicateName(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Rename an existing tag.
    ///
    /// # Errors
    /// - `ValidationError` for an invalid name
    /// - `NotFound` if no tag has this id
    /// - `DuplicateName` if another tag already uses the name
    /// - `UpdateFailed` if the store changed nothing
    pub async fn update(&self, id: i64, name: &str) -> Result<Tag, TagServiceError> {
        let name = validate_tag_name(name)?;

        let mut tag = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| TagServiceError::NotFound(id.to_string()))?;

        tag.name = name;
        match self.repo.update(&tag).await {
            Ok(true) => Ok(tag),
            Ok(false) => {
                tracing::warn!(tag_id = id, "Tag update affected no rows");
                Err(TagServiceError::UpdateFailed(id.to_string()))
            }
            Err(e) if is_unique_violation(&e) => Err(TagServiceError::DuplicateName(tag.name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a tag. Returns `false` if it does not exist.
    pub async fn delete(&self, id: i64) -> Result<bool, TagServiceError> {
        let deleted = self.repo.delete(id).await.map_err(|e| {
            tracing::error!(tag_id = id, error = %e, "Failed to delete tag");
            e
        })?;
        if !deleted {
            tracing::debug!(tag_id = id, "Tag to delete was not found");
        }
        Ok(deleted)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Tag>, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag by ID")
            .map_err(Into::into)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Tag>, TagServiceError> {
        self.repo
            .get_by_name(name.trim())
            .await
            .context("Failed to get tag by name")
            .map_err(Into::into)
    }

    /// List all tags ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list tags")
            .map_err(Into::into)
    }

    /// List all tags with their article counts
    pub async fn list_with_counts(&self) -> Result<Vec<TagWithCount>, TagServiceError> {
        self.repo
            .list_with_counts()
            .await
            .context("Failed to list tags with counts")
            .map_err(Into::into)
    }
}

/// Trim and check a tag name
pub fn validate_tag_name(name: &str) -> Result<String, TagServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TagServiceError::ValidationError(
            "Tag name cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_TAG_NAME_LENGTH {
        return Err(TagServiceError::ValidationError(format!(
            "Tag name cannot exceed {} characters",
            MAX_TAG_NAME_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}
