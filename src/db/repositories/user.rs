//! User repository
//!
//! Database operations for users, their role memberships and their claims.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::{Backend, DynDatabasePool};
use crate::models::{User, UserClaim};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, security_stamp, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Fails with a unique violation on a taken username or email.
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// List all users ordered by username
    async fn list(&self) -> Result<Vec<User>>;

    /// Total number of users
    async fn count(&self) -> Result<i64>;

    /// Save username, email and names. Returns false if no row matched.
    async fn update_profile(&self, user: &User) -> Result<bool>;

    /// Replace the password hash and security stamp. Returns false if no row matched.
    async fn update_password(&self, id: i64, password_hash: &str, security_stamp: &str)
        -> Result<bool>;

    /// Returns false if no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Names of the roles the user belongs to, ordered by name
    async fn get_role_names(&self, user_id: i64) -> Result<Vec<String>>;

    /// Add a membership; adding an existing one is a no-op
    async fn add_to_role(&self, user_id: i64, role_id: i64) -> Result<()>;

    /// Returns false if the user was not a member.
    async fn remove_from_role(&self, user_id: i64, role_id: i64) -> Result<bool>;

    async fn get_claims(&self, user_id: i64) -> Result<Vec<UserClaim>>;

    async fn add_claim(&self, user_id: i64, claim_type: &str, claim_value: &str)
        -> Result<UserClaim>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_user_sqlite(pool, user).await,
            Backend::Mysql(pool) => create_user_mysql(pool, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get user by ID")?;
                Ok(row.as_ref().map(row_to_user_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get user by ID")?;
                Ok(row.as_ref().map(row_to_user_mysql))
            }
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_user_by_field_sqlite(pool, "username", username).await,
            Backend::Mysql(pool) => get_user_by_field_mysql(pool, "username", username).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_user_by_field_sqlite(pool, "email", email).await,
            Backend::Mysql(pool) => get_user_by_field_mysql(pool, "email", email).await,
        }
    }

    async fn list(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY username");
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list users")?;
                Ok(rows.iter().map(row_to_user_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list users")?;
                Ok(rows.iter().map(row_to_user_mysql).collect())
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("SELECT COUNT(*) AS count FROM users")
                .fetch_one(pool)
                .await
                .map(|row| row.get::<i64, _>("count")),
            Backend::Mysql(pool) => sqlx::query("SELECT COUNT(*) AS count FROM users")
                .fetch_one(pool)
                .await
                .map(|row| row.get::<i64, _>("count")),
        }
        .context("Failed to count users")?;
        Ok(count)
    }

    async fn update_profile(&self, user: &User) -> Result<bool> {
        let sql = r#"
            UPDATE users
            SET username = ?, email = ?, first_name = ?, last_name = ?, updated_at = ?
            WHERE id = ?
        "#;
        let now = Utc::now();
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(now)
                .bind(user.id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(now)
                .bind(user.id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to update user")?;
        Ok(affected > 0)
    }

    async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        security_stamp: &str,
    ) -> Result<bool> {
        let sql = "UPDATE users SET password_hash = ?, security_stamp = ?, updated_at = ? WHERE id = ?";
        let now = Utc::now();
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(password_hash)
                .bind(security_stamp)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(password_hash)
                .bind(security_stamp)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to update password")?;
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete user")?;
        Ok(affected > 0)
    }

    async fn get_role_names(&self, user_id: i64) -> Result<Vec<String>> {
        let sql = r#"
            SELECT r.name
            FROM roles r
            INNER JOIN user_roles ur ON r.id = ur.role_id
            WHERE ur.user_id = ?
            ORDER BY r.name
        "#;
        let names: Vec<String> = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(user_id)
                .fetch_all(pool)
                .await
                .map(|rows| rows.iter().map(|row| row.get("name")).collect()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(user_id)
                .fetch_all(pool)
                .await
                .map(|rows| rows.iter().map(|row| row.get("name")).collect()),
        }
        .context("Failed to get user roles")?;
        Ok(names)
    }

    async fn add_to_role(&self, user_id: i64, role_id: i64) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
                    .bind(user_id)
                    .bind(role_id)
                    .execute(pool)
                    .await
                    .map(|_| ())
            }
            Backend::Mysql(pool) => {
                sqlx::query("INSERT IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
                    .bind(user_id)
                    .bind(role_id)
                    .execute(pool)
                    .await
                    .map(|_| ())
            }
        }
        .context("Failed to add user to role")
    }

    async fn remove_from_role(&self, user_id: i64, role_id: i64) -> Result<bool> {
        let sql = "DELETE FROM user_roles WHERE user_id = ? AND role_id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(role_id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(role_id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to remove user from role")?;
        Ok(affected > 0)
    }

    async fn get_claims(&self, user_id: i64) -> Result<Vec<UserClaim>> {
        let sql = "SELECT id, user_id, claim_type, claim_value FROM user_claims WHERE user_id = ? ORDER BY id";
        let claims: Vec<UserClaim> = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(user_id)
                .fetch_all(pool)
                .await
                .map(|rows| {
                    rows.iter()
                        .map(|row| UserClaim {
                            id: row.get("id"),
                            user_id: row.get("user_id"),
                            claim_type: row.get("claim_type"),
                            claim_value: row.get("claim_value"),
                        })
                        .collect()
                }),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(user_id)
                .fetch_all(pool)
                .await
                .map(|rows| {
                    rows.iter()
                        .map(|row| UserClaim {
                            id: row.get("id"),
                            user_id: row.get("user_id"),
                            claim_type: row.get("claim_type"),
                            claim_value: row.get("claim_value"),
                        })
                        .collect()
                }),
        }
        .context("Failed to get user claims")?;
        Ok(claims)
    }

    async fn add_claim(
        &self,
        user_id: i64,
        claim_type: &str,
        claim_value: &str,
    ) -> Result<UserClaim> {
        let sql = "INSERT INTO user_claims (user_id, claim_type, claim_value) VALUES (?, ?, ?)";
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(claim_type)
                .bind(claim_value)
                .execute(pool)
                .await
                .map(|r| r.last_insert_rowid()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(claim_type)
                .bind(claim_value)
                .execute(pool)
                .await
                .map(|r| r.last_insert_id() as i64),
        }
        .context("Failed to add user claim")?;

        Ok(UserClaim {
            id,
            user_id,
            claim_type: claim_type.to_string(),
            claim_value: claim_value.to_string(),
        })
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, first_name, last_name, security_stamp, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.security_stamp)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_field_sqlite(
    pool: &SqlitePool,
    field: &'static str,
    value: &str,
) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {field} = ?");
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {}", field))?;
    Ok(row.as_ref().map(row_to_user_sqlite))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        security_stamp: row.get("security_stamp"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, first_name, last_name, security_stamp, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.security_stamp)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_field_mysql(
    pool: &MySqlPool,
    field: &'static str,
    value: &str,
) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {field} = ?");
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {}", field))?;
    Ok(row.as_ref().map(row_to_user_mysql))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        security_stamp: row.get("security_stamp"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, is_unique_violation, migrations};
    use crate::models::{ADMINISTRATOR, ARTICLE_OWNER_CLAIM, USER};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn user(name: &str) -> User {
        User::new(
            name.to_string(),
            format!("{}@example.com", name),
            "hash".to_string(),
        )
    }

    async fn role_id(repo: &SqlxUserRepository, name: &str) -> i64 {
        let row = sqlx::query("SELECT id FROM roles WHERE name = ?")
            .bind(name)
            .fetch_one(repo.pool.as_sqlite().unwrap())
            .await
            .unwrap();
        row.get("id")
    }

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let repo = setup_test_repo().await;
        let created = repo.create(&user("alice")).await.unwrap();

        assert!(created.id > 0);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(
            repo.get_by_username("alice").await.unwrap().unwrap().id,
            created.id
        );
        assert_eq!(
            repo.get_by_email("alice@example.com").await.unwrap().unwrap().id,
            created.id
        );
        assert!(repo.get_by_id(created.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let repo = setup_test_repo().await;
        repo.create(&user("bob")).await.unwrap();

        let mut other = user("bobby");
        other.email = "bob@example.com".to_string();
        let err = repo.create(&other).await.unwrap_err();

        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_update_profile_and_password() {
        let repo = setup_test_repo().await;
        let mut created = repo.create(&user("carol")).await.unwrap();

        created.first_name = Some("Carol".to_string());
        created.email = "carol@new.example.com".to_string();
        assert!(repo.update_profile(&created).await.unwrap());
        assert!(repo.update_password(created.id, "new-hash", "new-stamp").await.unwrap());

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.first_name.as_deref(), Some("Carol"));
        assert_eq!(found.email, "carol@new.example.com");
        assert_eq!(found.password_hash, "new-hash");
        assert_eq!(found.security_stamp, "new-stamp");
    }

    #[tokio::test]
    async fn test_role_membership() {
        let repo = setup_test_repo().await;
        let created = repo.create(&user("dave")).await.unwrap();
        let admin = role_id(&repo, ADMINISTRATOR).await;
        let member = role_id(&repo, USER).await;

        repo.add_to_role(created.id, member).await.unwrap();
        repo.add_to_role(created.id, admin).await.unwrap();
        repo.add_to_role(created.id, admin).await.unwrap();

        assert_eq!(
            repo.get_role_names(created.id).await.unwrap(),
            vec![ADMINISTRATOR, USER]
        );
        assert!(repo.remove_from_role(created.id, admin).await.unwrap());
        assert!(!repo.remove_from_role(created.id, admin).await.unwrap());
        assert_eq!(repo.get_role_names(created.id).await.unwrap(), vec![USER]);
    }

    #[tokio::test]
    async fn test_claims_removed_with_user() {
        let repo = setup_test_repo().await;
        let created = repo.create(&user("erin")).await.unwrap();

        let claim = repo.add_claim(created.id, ARTICLE_OWNER_CLAIM, "12").await.unwrap();
        assert!(claim.is_article_owner_of("12"));
        assert_eq!(repo.get_claims(created.id).await.unwrap(), vec![claim]);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_claims(created.id).await.unwrap().is_empty());
        assert!(!repo.delete(created.id).await.unwrap());
    }
}
