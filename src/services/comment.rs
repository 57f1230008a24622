//! Comment service
//!
//! Comments hang off an article and are removed with it.

use crate::db::repositories::{ArticleRepository, CommentRepository};
use crate::models::{Comment, MAX_COMMENT_LENGTH, MAX_COMMENT_TITLE_LENGTH};
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    article_repo: Arc<dyn ArticleRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, article_repo: Arc<dyn ArticleRepository>) -> Self {
        Self { repo, article_repo }
    }

    /// All comments, newest first
    pub async fn list_all(&self) -> Result<Vec<Comment>, CommentServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list comments")
            .map_err(Into::into)
    }

    /// Comments under one article, oldest first
    pub async fn list_for_article(&self, article_id: i64) -> Result<Vec<Comment>, CommentServiceError> {
        self.repo
            .list_by_article(article_id)
            .await
            .context("Failed to list comments for article")
            .map_err(Into::into)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Comment>, CommentServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")
            .map_err(Into::into)
    }

    /// Post a comment under an article.
    ///
    /// # Errors
    /// - `ValidationError` for empty or oversized content/title
    /// - `NotFound` if the article does not exist
    pub async fn create(
        &self,
        article_id: i64,
        author_id: i64,
        title: Option<String>,
        content: &str,
    ) -> Result<Comment, CommentServiceError> {
        let (title, content) = validate_comment(title, content)?;

        if !self
            .article_repo
            .exists(article_id)
            .await
            .context("Failed to check article")?
        {
            return Err(CommentServiceError::NotFound(format!("article {}", article_id)));
        }

        let comment = self
            .repo
            .create(&Comment::new(article_id, author_id, title, content))
            .await?;

        tracing::info!(comment_id = comment.id, article_id, author_id, "Comment created");
        Ok(comment)
    }

    /// Replace a comment's title and content.
    pub async fn update(
        &self,
        id: i64,
        title: Option<String>,
        content: &str,
    ) -> Result<Comment, CommentServiceError> {
        let (title, content) = validate_comment(title, content)?;

        let mut comment = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", id)))?;

        comment.title = title;
        comment.content = content;

        if !self.repo.update(&comment).await? {
            return Err(CommentServiceError::NotFound(format!("comment {}", id)));
        }
        Ok(comment)
    }

    /// Delete a comment. Returns `false` if it does not exist.
    pub async fn delete(&self, id: i64) -> Result<bool, CommentServiceError> {
        let deleted = self.repo.delete(id).await.map_err(|e| {
            tracing::error!(comment_id = id, error = %e, "Failed to delete comment");
            e
        })?;
        Ok(deleted)
    }
}

fn validate_comment(
    title: Option<String>,
    content: &str,
) -> Result<(Option<String>, String), CommentServiceError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(CommentServiceError::ValidationError(
            "Comment content cannot be empty".to_string(),
        ));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(CommentServiceError::ValidationError(format!(
            "Comment cannot exceed {} characters",
            MAX_COMMENT_LENGTH
        )));
    }

    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if title
        .as_ref()
        .is_some_and(|t| t.chars().count() > MAX_COMMENT_TITLE_LENGTH)
    {
        return Err(CommentServiceError::ValidationError(format!(
            "Comment title cannot exceed {} characters",
            MAX_COMMENT_TITLE_LENGTH
        )));
    }

    Ok((title, content.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxArticleRepository, SqlxCommentRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Article, User};

    async fn setup() -> (CommentService, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "commenter".to_string(),
                "commenter@example.com".to_string(),
                "hash".to_string(),
            ))
            .await
            .unwrap();
        let articles = SqlxArticleRepository::boxed(pool.clone());
        let article = articles
            .create(
                &Article::new("Post".to_string(), "Body".to_string(), user.id),
                &[],
                user.id,
            )
            .await
            .unwrap();

        let service = CommentService::new(SqlxCommentRepository::boxed(pool), articles);
        (service, article.id, user.id)
    }

    #[tokio::test]
    async fn test_create_comment() {
        let (service, article_id, user_id) = setup().await;

        let comment = service
            .create(article_id, user_id, Some("  ".to_string()), " Nice post ")
            .await
            .unwrap();

        assert_eq!(comment.content, "Nice post");
        assert!(comment.title.is_none());
        assert_eq!(service.list_for_article(article_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_on_missing_article() {
        let (service, article_id, user_id) = setup().await;

        let result = service.create(article_id + 1, user_id, None, "Hello").await;

        assert!(matches!(result, Err(CommentServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_comment_length_limits() {
        let (service, article_id, user_id) = setup().await;

        assert!(matches!(
            service.create(article_id, user_id, None, "").await,
            Err(CommentServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(article_id, user_id, None, &"a".repeat(201)).await,
            Err(CommentServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service
                .create(article_id, user_id, Some("t".repeat(101)), "ok")
                .await,
            Err(CommentServiceError::ValidationError(_))
        ));
        assert!(service.create(article_id, user_id, None, &"a".repeat(200)).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (service, article_id, user_id) = setup().await;
        let comment = service.create(article_id, user_id, None, "First").await.unwrap();

        let updated = service
            .update(comment.id, Some("Title".to_string()), "Edited")
            .await
            .unwrap();
        assert_eq!(updated.content, "Edited");
        assert!(matches!(
            service.update(comment.id + 1, None, "x").await,
            Err(CommentServiceError::NotFound(_))
        ));

        assert!(service.delete(comment.id).await.unwrap());
        assert!(!service.delete(comment.id).await.unwrap());
    }
}
