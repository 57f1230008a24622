//! Role service

use crate::db::is_unique_violation;
use crate::db::repositories::RoleRepository;
use crate::models::{Role, MAX_ROLE_NAME_LENGTH};
use anyhow::Context;
use std::sync::Arc;

/// Error types for role service operations
#[derive(Debug, thiserror::Error)]
pub enum RoleServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Role not found: {0}")]
    NotFound(String),

    #[error("Role name already exists: {0}")]
    DuplicateName(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Role management
pub struct RoleService {
    repo: Arc<dyn RoleRepository>,
}

impl RoleService {
    pub fn new(repo: Arc<dyn RoleRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Role>, RoleServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list roles")
            .map_err(Into::into)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Role>, RoleServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get role")
            .map_err(Into::into)
    }

    /// Create a role.
    ///
    /// # Errors
    /// - `ValidationError` for an empty or oversized name
    /// - `DuplicateName` if the name is taken
    pub async fn create(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Role, RoleServiceError> {
        let role = Role {
            id: 0,
            name: validate_role_name(name)?,
            description: normalize_description(description),
        };

        match self.repo.create(&role).await {
            Ok(created) => {
                tracing::info!(role_id = created.id, name = %created.name, "Role created");
                Ok(created)
            }
            Err(e) if is_unique_violation(&e) => Err(RoleServiceError::DuplicateName(role.name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Rename or re-describe a role.
    pub async fn update(
        &self,
        id: i64,
        name: &str,
        description: Option<String>,
    ) -> Result<Role, RoleServiceError> {
        let name = validate_role_name(name)?;

        let mut role = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get role")?
            .ok_or_else(|| RoleServiceError::NotFound(id.to_string()))?;

        role.name = name;
        role.description = normalize_description(description);

        match self.repo.update(&role).await {
            Ok(true) => Ok(role),
            Ok(false) => Err(RoleServiceError::NotFound(id.to_string())),
            Err(e) if is_unique_violation(&e) => Err(RoleServiceError::DuplicateName(role.name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a role. Returns `false` if it does not exist.
    pub async fn delete(&self, id: i64) -> Result<bool, RoleServiceError> {
        let deleted = self.repo.delete(id).await.map_err(|e| {
            tracing::error!(role_id = id, error = %e, "Failed to delete role");
            e
        })?;
        Ok(deleted)
    }
}

fn validate_role_name(name: &str) -> Result<String, RoleServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RoleServiceError::ValidationError(
            "Role name cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_ROLE_NAME_LENGTH {
        return Err(RoleServiceError::ValidationError(format!(
            "Role name cannot exceed {} characters",
            MAX_ROLE_NAME_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}
