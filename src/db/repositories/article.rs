//! Article repository
//!
//! Database operations for articles and their tag links.
//!
//! Creating, editing and deleting an article touch several tables; each of
//! those runs in a single transaction so a failure leaves nothing half
//! written. Edits are guarded by the `version` column: an update whose
//! expected version no longer matches changes nothing.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Article, ARTICLE_OWNER_CLAIM};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const ARTICLE_COLUMNS: &str =
    "id, title, content, author_id, view_count, version, created_at, updated_at";

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert an article together with its tag links and the owner's
    /// `ArticleOwner` claim.
    async fn create(&self, article: &Article, tag_ids: &[i64], owner_id: i64) -> Result<Article>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    async fn exists(&self, id: i64) -> Result<bool>;

    /// All articles, newest first
    async fn list(&self) -> Result<Vec<Article>>;

    /// Articles written by one user, newest first
    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Article>>;

    /// Save title and content, attach and detach tags.
    ///
    /// `article.version` is the version the caller loaded. Returns false,
    /// changing nothing, when the stored version differs or the article is gone.
    async fn update_with_tags(
        &self,
        article: &Article,
        attach: &[i64],
        detach: &[i64],
    ) -> Result<bool>;

    /// Delete an article, its tag links, comments and ownership claims.
    /// Returns false if no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Bump the view counter. Returns false if no row matched.
    async fn increment_view_count(&self, id: i64) -> Result<bool>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &Article, tag_ids: &[i64], owner_id: i64) -> Result<Article> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_article_sqlite(pool, article, tag_ids, owner_id).await,
            Backend::Mysql(pool) => create_article_mysql(pool, article, tag_ids, owner_id).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?");
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get article by ID")?;
                Ok(row.as_ref().map(row_to_article_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get article by ID")?;
                Ok(row.as_ref().map(row_to_article_mysql))
            }
        }
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        let found = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("SELECT 1 FROM articles WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await
                .map(|row| row.is_some()),
            Backend::Mysql(pool) => sqlx::query("SELECT 1 FROM articles WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await
                .map(|row| row.is_some()),
        }
        .context("Failed to check article existence")?;
        Ok(found)
    }

    async fn list(&self) -> Result<Vec<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY created_at DESC, id DESC");
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list articles")?;
                Ok(rows.iter().map(row_to_article_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list articles")?;
                Ok(rows.iter().map(row_to_article_mysql).collect())
            }
        }
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE author_id = ? ORDER BY created_at DESC, id DESC"
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(author_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list articles by author")?;
                Ok(rows.iter().map(row_to_article_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(author_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list articles by author")?;
                Ok(rows.iter().map(row_to_article_mysql).collect())
            }
        }
    }

    async fn update_with_tags(
        &self,
        article: &Article,
        attach: &[i64],
        detach: &[i64],
    ) -> Result<bool> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_article_sqlite(pool, article, attach, detach).await,
            Backend::Mysql(pool) => update_article_mysql(pool, article, attach, detach).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => delete_article_sqlite(pool, id).await,
            Backend::Mysql(pool) => delete_article_mysql(pool, id).await,
        }
    }

    async fn increment_view_count(&self, id: i64) -> Result<bool> {
        let sql = "UPDATE articles SET view_count = view_count + 1 WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to increment view count")?;
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_article_sqlite(
    pool: &SqlitePool,
    article: &Article,
    tag_ids: &[i64],
    owner_id: i64,
) -> Result<Article> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO articles (title, content, author_id, view_count, version, created_at, updated_at)
        VALUES (?, ?, ?, 0, 1, ?, ?)
        "#,
    )
    .bind(&article.title)
    .bind(&article.content)
    .bind(article.author_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create article")?;
    let id = result.last_insert_rowid();

    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach tag")?;
    }

    sqlx::query("INSERT INTO user_claims (user_id, claim_type, claim_value) VALUES (?, ?, ?)")
        .bind(owner_id)
        .bind(ARTICLE_OWNER_CLAIM)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to record article owner")?;

    tx.commit().await.context("Failed to commit article")?;

    Ok(Article {
        id,
        view_count: 0,
        version: 1,
        created_at: now,
        updated_at: now,
        ..article.clone()
    })
}

async fn update_article_sqlite(
    pool: &SqlitePool,
    article: &Article,
    attach: &[i64],
    detach: &[i64],
) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        UPDATE articles
        SET title = ?, content = ?, updated_at = ?, version = version + 1
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(&article.title)
    .bind(&article.content)
    .bind(Utc::now())
    .bind(article.id)
    .bind(article.version)
    .execute(&mut *tx)
    .await
    .context("Failed to update article")?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    for tag_id in detach {
        sqlx::query("DELETE FROM article_tags WHERE article_id = ? AND tag_id = ?")
            .bind(article.id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to detach tag")?;
    }

    for tag_id in attach {
        sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article.id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach tag")?;
    }

    tx.commit().await.context("Failed to commit article update")?;
    Ok(true)
}

async fn delete_article_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM user_claims WHERE claim_type = ? AND claim_value = ?")
        .bind(ARTICLE_OWNER_CLAIM)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to delete article owner claims")?;

    let result = sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete article")?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    tx.commit().await.context("Failed to commit article delete")?;
    Ok(true)
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        view_count: row.get("view_count"),
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_article_mysql(
    pool: &MySqlPool,
    article: &Article,
    tag_ids: &[i64],
    owner_id: i64,
) -> Result<Article> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO articles (title, content, author_id, view_count, version, created_at, updated_at)
        VALUES (?, ?, ?, 0, 1, ?, ?)
        "#,
    )
    .bind(&article.title)
    .bind(&article.content)
    .bind(article.author_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create article")?;
    let id = result.last_insert_id() as i64;

    for tag_id in tag_ids {
        sqlx::query("INSERT IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach tag")?;
    }

    sqlx::query("INSERT INTO user_claims (user_id, claim_type, claim_value) VALUES (?, ?, ?)")
        .bind(owner_id)
        .bind(ARTICLE_OWNER_CLAIM)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to record article owner")?;

    tx.commit().await.context("Failed to commit article")?;

    Ok(Article {
        id,
        view_count: 0,
        version: 1,
        created_at: now,
        updated_at: now,
        ..article.clone()
    })
}

async fn update_article_mysql(
    pool: &MySqlPool,
    article: &Article,
    attach: &[i64],
    detach: &[i64],
) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        UPDATE articles
        SET title = ?, content = ?, updated_at = ?, version = version + 1
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(&article.title)
    .bind(&article.content)
    .bind(Utc::now())
    .bind(article.id)
    .bind(article.version)
    .execute(&mut *tx)
    .await
    .context("Failed to update article")?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    for tag_id in detach {
        sqlx::query("DELETE FROM article_tags WHERE article_id = ? AND tag_id = ?")
            .bind(article.id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to detach tag")?;
    }

    for tag_id in attach {
        sqlx::query("INSERT IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article.id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach tag")?;
    }

    tx.commit().await.context("Failed to commit article update")?;
    Ok(true)
}

async fn delete_article_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM user_claims WHERE claim_type = ? AND claim_value = ?")
        .bind(ARTICLE_OWNER_CLAIM)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to delete article owner claims")?;

    let result = sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete article")?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    tx.commit().await.context("Failed to commit article delete")?;
    Ok(true)
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Article {
    Article {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        view_count: row.get("view_count"),
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
