//! User model
//!
//! Users, their security claims and the view models the admin screens use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RoleCheckbox;

/// Claim type granting edit rights over one article
pub const ARTICLE_OWNER_CLAIM: &str = "ArticleOwner";

/// Maximum first/last name length in characters
pub const MAX_PERSON_NAME_LENGTH: usize = 50;

/// Registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Login name (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Random value rotated whenever credentials change; backs reset tokens
    #[serde(skip_serializing)]
    pub security_stamp: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User.
    ///
    /// The password must already be hashed with
    /// `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            username,
            email,
            password_hash,
            first_name: None,
            last_name: None,
            security_stamp: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Security claim attached to a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserClaim {
    pub id: i64,
    pub user_id: i64,
    pub claim_type: String,
    pub claim_value: String,
}

impl UserClaim {
    /// Whether this is the ownership claim for the given article id
    pub fn is_article_owner_of(&self, article_id: &str) -> bool {
        self.claim_type == ARTICLE_OWNER_CLAIM && self.claim_value == article_id
    }
}

/// User row on the admin listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Vec<String>,
}

impl UserView {
    pub fn new(user: User, roles: Vec<String>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            roles,
        }
    }
}

/// User edit form with every role as a checkbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEditView {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Vec<RoleCheckbox>,
}

/// Body of `PUT /users/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditUserRequest {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// New password; left unchanged when absent or empty
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleCheckbox>,
}
