//! Comment repository
//!
//! Database operations for comments on articles.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Comment;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// All comments, newest first
    async fn list(&self) -> Result<Vec<Comment>>;

    /// Comments under one article, oldest first
    async fn list_by_article(&self, article_id: i64) -> Result<Vec<Comment>>;

    /// Save title and content. Returns false if no row matched.
    async fn update(&self, comment: &Comment) -> Result<bool>;

    /// Returns false if no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_comment_sqlite(pool, comment).await,
            Backend::Mysql(pool) => create_comment_mysql(pool, comment).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = "SELECT id, article_id, author_id, title, content, created_at FROM comments WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get comment by ID")?;
                Ok(row.as_ref().map(row_to_comment_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get comment by ID")?;
                Ok(row.as_ref().map(row_to_comment_mysql))
            }
        }
    }

    async fn list(&self) -> Result<Vec<Comment>> {
        let sql = "SELECT id, article_id, author_id, title, content, created_at FROM comments ORDER BY created_at DESC, id DESC";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list comments")?;
                Ok(rows.iter().map(row_to_comment_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list comments")?;
                Ok(rows.iter().map(row_to_comment_mysql).collect())
            }
        }
    }

    async fn list_by_article(&self, article_id: i64) -> Result<Vec<Comment>> {
        let sql = "SELECT id, article_id, author_id, title, content, created_at FROM comments WHERE article_id = ? ORDER BY created_at, id";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .bind(article_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list comments by article")?;
                Ok(rows.iter().map(row_to_comment_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .bind(article_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list comments by article")?;
                Ok(rows.iter().map(row_to_comment_mysql).collect())
            }
        }
    }

    async fn update(&self, comment: &Comment) -> Result<bool> {
        let sql = "UPDATE comments SET title = ?, content = ? WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(&comment.title)
                .bind(&comment.content)
                .bind(comment.id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(&comment.title)
                .bind(&comment.content)
                .bind(comment.id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to update comment")?;
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete comment")?;
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_comment_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (article_id, author_id, title, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.article_id)
    .bind(comment.author_id)
    .bind(&comment.title)
    .bind(&comment.content)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        created_at: now,
        ..comment.clone()
    })
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        article_id: row.get("article_id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_comment_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (article_id, author_id, title, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.article_id)
    .bind(comment.author_id)
    .bind(&comment.title)
    .bind(&comment.content)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        created_at: now,
        ..comment.clone()
    })
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        article_id: row.get("article_id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_db() -> (SqlxCommentRepository, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();

        let user_id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, security_stamp) VALUES ('reader', 'reader@example.com', 'hash', 'stamp')",
        )
        .execute(sqlite)
        .await
        .unwrap()
        .last_insert_rowid();
        let article_id = sqlx::query(
            "INSERT INTO articles (title, content, author_id) VALUES ('Title', 'Content', ?)",
        )
        .bind(user_id)
        .execute(sqlite)
        .await
        .unwrap()
        .last_insert_rowid();

        (SqlxCommentRepository::new(pool), article_id, user_id)
    }

    #[tokio::test]
    async fn test_create_and_list_comments() {
        let (repo, article_id, user_id) = setup_test_db().await;

        let first = repo
            .create(&Comment::new(article_id, user_id, None, "First".to_string()))
            .await
            .unwrap();
        let second = repo
            .create(&Comment::new(
                article_id,
                user_id,
                Some("Re".to_string()),
                "Second".to_string(),
            ))
            .await
            .unwrap();

        let for_article = repo.list_by_article(article_id).await.unwrap();
        assert_eq!(for_article.len(), 2);
        assert_eq!(for_article[0].id, first.id);
        assert_eq!(for_article[1].title.as_deref(), Some("Re"));

        let all = repo.list().await.unwrap();
        assert_eq!(all[0].id, second.id);
        assert!(repo.list_by_article(article_id + 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_comment() {
        let (repo, article_id, user_id) = setup_test_db().await;
        let mut comment = repo
            .create(&Comment::new(article_id, user_id, None, "Draft".to_string()))
            .await
            .unwrap();

        comment.content = "Final".to_string();
        assert!(repo.update(&comment).await.unwrap());
        assert_eq!(
            repo.get_by_id(comment.id).await.unwrap().unwrap().content,
            "Final"
        );

        assert!(repo.delete(comment.id).await.unwrap());
        assert!(!repo.delete(comment.id).await.unwrap());
        assert!(repo.get_by_id(comment.id).await.unwrap().is_none());
    }
}
