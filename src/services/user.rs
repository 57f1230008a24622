//! User service
//!
//! Implements business logic for user management:
//! - Registration (the first user becomes Administrator)
//! - Login/logout and session validation
//! - Admin views and edits, including role membership
//! - Password reset through security-stamp tokens

use crate::db::is_unique_violation;
use crate::db::repositories::{RoleRepository, SessionRepository, UserRepository};
use crate::models::{
    EditUserRequest, RoleCheckbox, Session, User, UserEditView, UserView, ADMINISTRATOR,
    MAX_PERSON_NAME_LENGTH, USER,
};
use crate::services::authorization::Principal;
use crate::services::password::{
    hash_password, new_security_stamp, verify_password, MIN_PASSWORD_LENGTH,
};
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

/// Default session expiration time in days
pub const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Username or email already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Reset token does not match the user's current security stamp
    #[error("Invalid password reset token")]
    InvalidResetToken,

    /// Session expired
    #[error("Session expired")]
    SessionExpired,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for user registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    role_repo: Arc<dyn RoleRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the default session lifetime
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        role_repo: Arc<dyn RoleRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            user_repo,
            role_repo,
            session_repo,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Override how many days a login session lasts
    pub fn with_session_expiration(mut self, days: i64) -> Self {
        self.session_expiration_days = days;
        self
    }

    /// Register a new user.
    ///
    /// The very first user is placed in the Administrator role, everyone
    /// after that in User.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a bad username, email or password
    /// - `UserExists` if the username or email is taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();
        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(&input.password)?;

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let is_first = self.user_repo.count().await.context("Failed to count users")? == 0;
        let role_name = if is_first { ADMINISTRATOR } else { USER };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let created = match self
            .user_repo
            .create(&User::new(username, email, password_hash))
            .await
        {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => {
                return Err(UserServiceError::UserExists(
                    "Username or email is already taken".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        match self
            .role_repo
            .get_by_name(role_name)
            .await
            .context("Failed to look up role")?
        {
            Some(role) => self
                .user_repo
                .add_to_role(created.id, role.id)
                .await
                .context("Failed to assign role")?,
            None => tracing::warn!(role = role_name, "Default role missing, user left without role"),
        }

        tracing::info!(user_id = created.id, username = %created.username, role = role_name, "User registered");
        Ok(created)
    }

    /// Check credentials and open a new session.
    ///
    /// # Errors
    ///
    /// - `AuthenticationError` if the user is unknown or the password is wrong
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let login = input.username_or_email.trim();
        let invalid =
            || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = match self.find_by_username_or_email(login).await? {
            Some(user) => user,
            None => {
                tracing::info!(login = %login, "Login failed: unknown user");
                return Err(invalid());
            }
        };

        if !verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?
        {
            tracing::info!(user_id = user.id, "Login failed: wrong password");
            return Err(invalid());
        }

        let session = self
            .session_repo
            .create(&Session::start(user.id, self.session_expiration_days))
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(session)
    }

    /// Invalidate a session token
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Unknown tokens and expired sessions yield `None`; expired sessions are
    /// deleted on the way.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let Some(session) = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        self.user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")
            .map_err(Into::into)
    }

    /// Roles and claims of a user, for policy checks
    pub async fn load_principal(&self, user: &User) -> Result<Principal, UserServiceError> {
        let roles = self
            .user_repo
            .get_role_names(user.id)
            .await
            .context("Failed to load roles")?;
        let claims = self
            .user_repo
            .get_claims(user.id)
            .await
            .context("Failed to load claims")?;

        Ok(Principal {
            user_id: user.id,
            username: user.username.clone(),
            roles,
            claims,
        })
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")
            .map_err(Into::into)
    }

    /// Every user with their role names
    pub async fn get_users_view(&self) -> Result<Vec<UserView>, UserServiceError> {
        let users = self.user_repo.list().await.context("Failed to list users")?;

        let mut views = Vec::with_capacity(users.len());
        for user in users {
            let roles = self
                .user_repo
                .get_role_names(user.id)
                .await
                .context("Failed to load roles")?;
            views.push(UserView::new(user, roles));
        }
        Ok(views)
    }

    pub async fn get_user_view(&self, id: i64) -> Result<Option<UserView>, UserServiceError> {
        let Some(user) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let roles = self
            .user_repo
            .get_role_names(id)
            .await
            .context("Failed to load roles")?;
        Ok(Some(UserView::new(user, roles)))
    }

    /// Edit form for a user: scalar fields plus every role as a checkbox
    pub async fn get_user_edit_view(
        &self,
        id: i64,
    ) -> Result<Option<UserEditView>, UserServiceError> {
        let Some(user) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let current = self
            .user_repo
            .get_role_names(id)
            .await
            .context("Failed to load roles")?;
        let roles = self
            .role_repo
            .list()
            .await
            .context("Failed to list roles")?
            .into_iter()
            .map(|role| RoleCheckbox {
                is_checked: current.contains(&role.name),
                id: role.id,
                name: role.name,
            })
            .collect();

        Ok(Some(UserEditView {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            roles,
        }))
    }

    /// Apply an admin edit.
    ///
    /// The username follows the email. A non-empty `new_password` is applied
    /// through a reset token. Every role checkbox that differs from the
    /// current membership is applied; names of unknown roles are skipped.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    /// - `ValidationError` for a bad email, name or password
    /// - `UserExists` if the email belongs to someone else
    pub async fn update_user(&self, request: EditUserRequest) -> Result<UserView, UserServiceError> {
        let email = request.email.trim().to_string();
        validate_email(&email)?;
        validate_username(&email)?;
        let first_name = validate_person_name("First name", request.first_name)?;
        let last_name = validate_person_name("Last name", request.last_name)?;
        let new_password = request.new_password.filter(|p| !p.is_empty());
        if let Some(password) = &new_password {
            validate_password(password)?;
        }

        let mut user = self
            .get_by_id(request.id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(format!("user {}", request.id)))?;

        user.username = email.clone();
        user.email = email;
        user.first_name = first_name;
        user.last_name = last_name;

        match self.user_repo.update_profile(&user).await {
            Ok(true) => {}
            Ok(false) => return Err(UserServiceError::NotFound(format!("user {}", user.id))),
            Err(e) if is_unique_violation(&e) => {
                return Err(UserServiceError::UserExists(format!(
                    "Email '{}' is already registered",
                    user.email
                )))
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(password) = new_password {
            let token = self.generate_password_reset_token(user.id).await?;
            self.reset_password(user.id, &token, &password).await?;
        }

        self.apply_role_changes(user.id, &request.roles).await?;

        let roles = self
            .user_repo
            .get_role_names(user.id)
            .await
            .context("Failed to load roles")?;
        tracing::info!(user_id = user.id, "User updated");
        Ok(UserView::new(user, roles))
    }

    async fn apply_role_changes(
        &self,
        user_id: i64,
        requested: &[RoleCheckbox],
    ) -> Result<(), UserServiceError> {
        let current = self
            .user_repo
            .get_role_names(user_id)
            .await
            .context("Failed to load roles")?;

        for checkbox in requested {
            let is_member = current.contains(&checkbox.name);
            if checkbox.is_checked == is_member {
                continue;
            }

            let Some(role) = self
                .role_repo
                .get_by_name(&checkbox.name)
                .await
                .context("Failed to look up role")?
            else {
                tracing::warn!(user_id, role = %checkbox.name, "Skipping unknown role");
                continue;
            };

            if checkbox.is_checked {
                self.user_repo
                    .add_to_role(user_id, role.id)
                    .await
                    .context("Failed to add role")?;
                tracing::info!(user_id, role = %role.name, "Role granted");
            } else {
                self.user_repo
                    .remove_from_role(user_id, role.id)
                    .await
                    .context("Failed to remove role")?;
                tracing::info!(user_id, role = %role.name, "Role revoked");
            }
        }
        Ok(())
    }

    /// Token authorising one password reset. It stays valid until the
    /// password changes.
    pub async fn generate_password_reset_token(
        &self,
        user_id: i64,
    ) -> Result<String, UserServiceError> {
        let user = self
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(format!("user {}", user_id)))?;
        Ok(user.security_stamp)
    }

    /// Set a new password if `token` is the user's current reset token.
    ///
    /// Rotates the security stamp and ends all of the user's sessions.
    pub async fn reset_password(
        &self,
        user_id: i64,
        token: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        validate_password(new_password)?;

        let user = self
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(format!("user {}", user_id)))?;
        if user.security_stamp != token {
            return Err(UserServiceError::InvalidResetToken);
        }

        let password_hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo
            .update_password(user_id, &password_hash, &new_security_stamp())
            .await
            .context("Failed to update password")?;
        self.session_repo
            .delete_by_user(user_id)
            .await
            .context("Failed to end sessions")?;

        tracing::info!(user_id, "Password reset");
        Ok(())
    }

    /// Add a user to a role by name
    pub async fn add_to_role(&self, user_id: i64, role_name: &str) -> Result<(), UserServiceError> {
        let role_id = self.resolve_membership(user_id, role_name).await?;
        self.user_repo
            .add_to_role(user_id, role_id)
            .await
            .context("Failed to add role")?;
        Ok(())
    }

    /// Remove a user from a role by name. Returns `false` if they were not a member.
    pub async fn remove_from_role(
        &self,
        user_id: i64,
        role_name: &str,
    ) -> Result<bool, UserServiceError> {
        let role_id = self.resolve_membership(user_id, role_name).await?;
        self.user_repo
            .remove_from_role(user_id, role_id)
            .await
            .context("Failed to remove role")
            .map_err(Into::into)
    }

    /// Role names of a user
    pub async fn get_roles(&self, user_id: i64) -> Result<Vec<String>, UserServiceError> {
        if self.get_by_id(user_id).await?.is_none() {
            return Err(UserServiceError::NotFound(format!("user {}", user_id)));
        }
        self.user_repo
            .get_role_names(user_id)
            .await
            .context("Failed to load roles")
            .map_err(Into::into)
    }

    /// Delete a user. Returns `false` if they do not exist.
    pub async fn delete_user(&self, id: i64) -> Result<bool, UserServiceError> {
        let deleted = self.user_repo.delete(id).await.map_err(|e| {
            tracing::error!(user_id = id, error = %e, "Failed to delete user");
            e
        })?;
        Ok(deleted)
    }

    /// Remove sessions past their expiry
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        self.session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")
            .map_err(Into::into)
    }

    async fn find_by_username_or_email(&self, login: &str) -> Result<Option<User>, UserServiceError> {
        if let Some(user) = self
            .user_repo
            .get_by_username(login)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }
        self.user_repo
            .get_by_email(login)
            .await
            .context("Failed to get user by email")
            .map_err(Into::into)
    }

    async fn resolve_membership(&self, user_id: i64, role_name: &str) -> Result<i64, UserServiceError> {
        if self.get_by_id(user_id).await?.is_none() {
            return Err(UserServiceError::NotFound(format!("user {}", user_id)));
        }
        let role = self
            .role_repo
            .get_by_name(role_name)
            .await
            .context("Failed to look up role")?
            .ok_or_else(|| UserServiceError::NotFound(format!("role {}", role_name)))?;
        Ok(role.id)
    }
}

fn validate_username(username: &str) -> Result<(), UserServiceError> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(UserServiceError::ValidationError(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    if email.is_empty() || !email.contains('@') {
        return Err(UserServiceError::ValidationError(
            "Invalid email address".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), UserServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn validate_person_name(
    field: &str,
    value: Option<String>,
) -> Result<Option<String>, UserServiceError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    if value
        .as_ref()
        .is_some_and(|v| v.chars().count() > MAX_PERSON_NAME_LENGTH)
    {
        return Err(UserServiceError::ValidationError(format!(
            "{} cannot exceed {} characters",
            field, MAX_PERSON_NAME_LENGTH
        )));
    }
    Ok(value)
}
