//! Role repository
//!
//! Database operations for roles. Membership lives in `user_roles` and is
//! handled by the user repository.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Role;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Role repository trait
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Insert a role. Fails with a unique violation if the name is taken.
    async fn create(&self, role: &Role) -> Result<Role>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Role>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// List all roles ordered by name
    async fn list(&self) -> Result<Vec<Role>>;

    /// Returns false if no row matched.
    async fn update(&self, role: &Role) -> Result<bool>;

    /// Returns false if no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based role repository implementation
pub struct SqlxRoleRepository {
    pool: DynDatabasePool,
}

impl SqlxRoleRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RoleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RoleRepository for SqlxRoleRepository {
    async fn create(&self, role: &Role) -> Result<Role> {
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query("INSERT INTO roles (name, description) VALUES (?, ?)")
                    .bind(&role.name)
                    .bind(&role.description)
                    .execute(pool)
                    .await
                    .map(|r| r.last_insert_rowid())
            }
            Backend::Mysql(pool) => {
                sqlx::query("INSERT INTO roles (name, description) VALUES (?, ?)")
                    .bind(&role.name)
                    .bind(&role.description)
                    .execute(pool)
                    .await
                    .map(|r| r.last_insert_id() as i64)
            }
        }
        .context("Failed to create role")?;

        Ok(Role {
            id,
            name: role.name.clone(),
            description: role.description.clone(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Role>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_role_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_role_by_id_mysql(pool, id).await,
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Role>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_role_by_name_sqlite(pool, name).await,
            Backend::Mysql(pool) => get_role_by_name_mysql(pool, name).await,
        }
    }

    async fn list(&self) -> Result<Vec<Role>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_roles_sqlite(pool).await,
            Backend::Mysql(pool) => list_roles_mysql(pool).await,
        }
    }

    async fn update(&self, role: &Role) -> Result<bool> {
        let sql = "UPDATE roles SET name = ?, description = ? WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(&role.name)
                .bind(&role.description)
                .bind(role.id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(&role.name)
                .bind(&role.description)
                .bind(role.id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to update role")?;
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("DELETE FROM roles WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query("DELETE FROM roles WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete role")?;
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_role_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Role>> {
    let row = sqlx::query("SELECT id, name, description FROM roles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get role by ID")?;
    Ok(row.as_ref().map(row_to_role_sqlite))
}

async fn get_role_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Role>> {
    let row = sqlx::query("SELECT id, name, description FROM roles WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get role by name")?;
    Ok(row.as_ref().map(row_to_role_sqlite))
}

async fn list_roles_sqlite(pool: &SqlitePool) -> Result<Vec<Role>> {
    let rows = sqlx::query("SELECT id, name, description FROM roles ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list roles")?;
    Ok(rows.iter().map(row_to_role_sqlite).collect())
}

fn row_to_role_sqlite(row: &sqlx::sqlite::SqliteRow) -> Role {
    Role {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_role_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Role>> {
    let row = sqlx::query("SELECT id, name, description FROM roles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get role by ID")?;
    Ok(row.as_ref().map(row_to_role_mysql))
}

async fn get_role_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<Role>> {
    let row = sqlx::query("SELECT id, name, description FROM roles WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get role by name")?;
    Ok(row.as_ref().map(row_to_role_mysql))
}

async fn list_roles_mysql(pool: &MySqlPool) -> Result<Vec<Role>> {
    let rows = sqlx::query("SELECT id, name, description FROM roles ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list roles")?;
    Ok(rows.iter().map(row_to_role_mysql).collect())
}

fn row_to_role_mysql(row: &sqlx::mysql::MySqlRow) -> Role {
    Role {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
    }
}
