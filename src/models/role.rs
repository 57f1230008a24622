//! Role model

use serde::{Deserialize, Serialize};

/// Role with full access to users, roles and content
pub const ADMINISTRATOR: &str = "Administrator";

/// Role that may edit or delete any article
pub const MODERATOR: &str = "Moderator";

/// Role given to every self-registered user after the first
pub const USER: &str = "User";

/// Maximum role name length in characters
pub const MAX_ROLE_NAME_LENGTH: usize = 50;

/// Named group of users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Role {
    pub id: i64,
    /// Role name (unique)
    pub name: String,
    pub description: Option<String>,
}

/// Role checkbox on the user edit form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleCheckbox {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub is_checked: bool,
}

/// Body of `POST /roles`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoleInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `PUT /roles/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditRoleRequest {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
