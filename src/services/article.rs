//! Article service
//!
//! Owns the article lifecycle:
//! - Creation with tag resolution and the owner's `ArticleOwner` claim
//! - Edits that reconcile the tag set instead of replacing it
//! - Listing, sorting and paging of article details
//! - Best-effort view counting

use crate::db::repositories::{
    ArticleRepository, CommentRepository, TagRepository, UserRepository,
};
use crate::models::{
    Article, ArticleDetail, AuthorSummary, CreateArticleInput, EditArticleRequest, ListParams,
    PagedResult, SortKey, Tag, TagCheckbox, TagSelection, MAX_CONTENT_LENGTH, MAX_TITLE_LENGTH,
};
use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    /// Article not found
    #[error("Article not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The article changed between load and save
    #[error("Article was modified concurrently: {0}")]
    Conflict(String),

    /// The article could not be stored; the cause is logged
    #[error("Failed to create article")]
    CreationFailed,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Article service
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    tag_repo: Arc<dyn TagRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl ArticleService {
    /// Create a new article service
    ///
    /// # Arguments
    /// * `repo` - Article repository for database operations
    /// * `tag_repo` - Tag lookups and article tag links
    /// * `comment_repo` - Comments shown with an article
    /// * `user_repo` - Author lookups
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        tag_repo: Arc<dyn TagRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            repo,
            tag_repo,
            comment_repo,
            user_repo,
        }
    }

    /// Every article with author, tags and comments, newest first
    pub async fn list_all(&self) -> Result<Vec<ArticleDetail>, ArticleServiceError> {
        let articles = self.repo.list().await.context("Failed to list articles")?;
        self.load_details(articles).await
    }

    /// One page of articles in the requested order
    pub async fn list_page(
        &self,
        params: &ListParams,
        sort: SortKey,
    ) -> Result<PagedResult<ArticleDetail>, ArticleServiceError> {
        let all = sort_order(self.list_all().await?, sort);
        Ok(PagedResult::from_vec(all, params))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ArticleDetail>, ArticleServiceError> {
        let Some(article) = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get article")?
        else {
            return Ok(None);
        };
        let mut details = self.load_details(vec![article]).await?;
        Ok(details.pop())
    }

    /// Articles written by one user, newest first
    pub async fn get_by_author(
        &self,
        author_id: i64,
    ) -> Result<Vec<ArticleDetail>, ArticleServiceError> {
        let articles = self
            .repo
            .list_by_author(author_id)
            .await
            .context("Failed to list articles by author")?;
        self.load_details(articles).await
    }

    /// Every tag as an unchecked checkbox, the model of the new-article form
    pub async fn get_tag_checkboxes(&self) -> Result<Vec<TagCheckbox>, ArticleServiceError> {
        let tags = self.tag_repo.list().await.context("Failed to list tags")?;
        Ok(tags.into_iter().map(TagCheckbox::from).collect())
    }

    /// Create an article on behalf of `acting_user_id`.
    ///
    /// Only checked tags are considered, and only those that already exist
    /// are attached; unknown names are skipped. The article, its tag links
    /// and the acting user's ownership claim are stored together.
    ///
    /// # Errors
    /// - `ValidationError` for a bad title or content, or an unknown author
    /// - `CreationFailed` if the store rejects the write
    pub async fn create(
        &self,
        input: CreateArticleInput,
        acting_user_id: i64,
    ) -> Result<ArticleDetail, ArticleServiceError> {
        let (title, content) = validate_article(&input.title, &input.content)?;

        if self
            .user_repo
            .get_by_id(input.author_id)
            .await
            .context("Failed to check author")?
            .is_none()
        {
            return Err(ArticleServiceError::ValidationError(format!(
                "Author {} does not exist",
                input.author_id
            )));
        }

        let mut tag_ids = Vec::new();
        for checkbox in input.tags.iter().filter(|t| t.is_checked) {
            let name = checkbox.label_name.trim();
            match self
                .tag_repo
                .get_by_name(name)
                .await
                .context("Failed to look up tag")?
            {
                Some(tag) if !tag_ids.contains(&tag.id) => tag_ids.push(tag.id),
                Some(_) => {}
                None => tracing::debug!(tag = %name, "Skipping unknown tag"),
            }
        }

        let draft = Article::new(title, content, input.author_id);
        let article = match self.repo.create(&draft, &tag_ids, acting_user_id).await {
            Ok(article) => article,
            Err(e) => {
                tracing::error!(author_id = input.author_id, error = ?e, "Failed to create article");
                return Err(ArticleServiceError::CreationFailed);
            }
        };

        tracing::info!(article_id = article.id, author_id = article.author_id, tags = tag_ids.len(), "Article created");

        let mut details = self.load_details(vec![article]).await?;
        details.pop().ok_or(ArticleServiceError::CreationFailed)
    }

    /// Apply an edit request.
    ///
    /// Selected tags that are not attached get attached if a tag with that
    /// name exists; unselected tags that are attached get detached. Tags not
    /// mentioned are left alone, so applying the same request twice has the
    /// same effect as applying it once.
    ///
    /// # Errors
    /// - `NotFound` if the article does not exist or vanished during the save
    /// - `ValidationError` for a bad title or content
    /// - `Conflict` if the article was changed since `request.version`
    pub async fn edit(
        &self,
        request: EditArticleRequest,
    ) -> Result<ArticleDetail, ArticleServiceError> {
        let mut article = self
            .repo
            .get_by_id(request.article_id)
            .await
            .context("Failed to get article")?
            .ok_or_else(|| ArticleServiceError::NotFound(request.article_id.to_string()))?;

        let (title, content) = validate_article(&request.title, &request.content)?;

        let attached = self
            .tag_repo
            .get_by_article_id(article.id)
            .await
            .context("Failed to load article tags")?;
        let (attach, detach) = self.reconcile_tags(&attached, &request.tags).await?;

        article.title = title;
        article.content = content;
        if let Some(version) = request.version {
            article.version = version;
        }

        let saved = self
            .repo
            .update_with_tags(&article, &attach, &detach)
            .await
            .context("Failed to save article")?;

        if !saved {
            let exists = self
                .repo
                .exists(article.id)
                .await
                .context("Failed to re-check article")?;
            if !exists {
                return Err(ArticleServiceError::NotFound(article.id.to_string()));
            }
            tracing::warn!(article_id = article.id, version = article.version, "Edit rejected, article changed meanwhile");
            return Err(ArticleServiceError::Conflict(article.id.to_string()));
        }

        tracing::info!(article_id = article.id, attached = attach.len(), detached = detach.len(), "Article updated");

        self.get_by_id(article.id)
            .await?
            .ok_or_else(|| ArticleServiceError::NotFound(article.id.to_string()))
    }

    async fn reconcile_tags(
        &self,
        attached: &[Tag],
        requested: &[TagSelection],
    ) -> Result<(Vec<i64>, Vec<i64>), ArticleServiceError> {
        let mut attach = Vec::new();
        let mut detach = Vec::new();

        for selection in requested {
            let name = selection.name.trim();
            let current = attached.iter().find(|t| t.name == name);

            match (selection.is_selected, current) {
                (true, None) => {
                    let found = self
                        .tag_repo
                        .get_by_name(name)
                        .await
                        .context("Failed to look up tag")?;
                    match found {
                        Some(tag) if !attach.contains(&tag.id) => attach.push(tag.id),
                        Some(_) => {}
                        None => tracing::debug!(tag = %name, "Skipping unknown tag"),
                    }
                }
                (false, Some(tag)) if !detach.contains(&tag.id) => detach.push(tag.id),
                _ => {}
            }
        }

        Ok((attach, detach))
    }

    /// Delete an article. Returns `false` if it does not exist.
    pub async fn delete(&self, id: i64) -> Result<bool, ArticleServiceError> {
        match self.repo.delete(id).await {
            Ok(true) => {
                tracing::info!(article_id = id, "Article deleted");
                Ok(true)
            }
            Ok(false) => {
                tracing::debug!(article_id = id, "Article to delete was not found");
                Ok(false)
            }
            Err(e) => {
                tracing::error!(article_id = id, error = ?e, "Failed to delete article");
                Err(e.into())
            }
        }
    }

    /// Count one view. Never fails; `false` means nothing was counted.
    pub async fn increment_view_count(&self, id: i64) -> bool {
        match self.repo.increment_view_count(id).await {
            Ok(counted) => {
                if !counted {
                    tracing::warn!(article_id = id, "View not counted, article missing");
                }
                counted
            }
            Err(e) => {
                tracing::error!(article_id = id, error = ?e, "Failed to increment view count");
                false
            }
        }
    }

    /// Edit form for an article.
    ///
    /// Lists the attached tags as selected followed by every other tag as
    /// unselected, one entry per tag id.
    pub async fn get_edit_request_by_id(
        &self,
        id: i64,
    ) -> Result<EditArticleRequest, ArticleServiceError> {
        let article = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or_else(|| ArticleServiceError::NotFound(id.to_string()))?;

        let attached = self
            .tag_repo
            .get_by_article_id(id)
            .await
            .context("Failed to load article tags")?;
        let all = self.tag_repo.list().await.context("Failed to list tags")?;

        Ok(EditArticleRequest {
            article_id: article.id,
            title: article.title,
            content: article.content,
            tags: tag_selection_union(&attached, &all),
            version: Some(article.version),
        })
    }

    async fn load_details(
        &self,
        articles: Vec<Article>,
    ) -> Result<Vec<ArticleDetail>, ArticleServiceError> {
        let mut authors: HashMap<i64, Option<AuthorSummary>> = HashMap::new();
        let mut details = Vec::with_capacity(articles.len());

        for article in articles {
            if !authors.contains_key(&article.author_id) {
                let author = self
                    .user_repo
                    .get_by_id(article.author_id)
                    .await
                    .context("Failed to load author")?
                    .map(|u| AuthorSummary {
                        id: u.id,
                        username: u.username,
                        email: u.email,
                    });
                authors.insert(article.author_id, author);
            }

            let tags = self
                .tag_repo
                .get_by_article_id(article.id)
                .await
                .context("Failed to load article tags")?;
            let comments = self
                .comment_repo
                .list_by_article(article.id)
                .await
                .context("Failed to load comments")?;

            details.push(ArticleDetail {
                author: authors.get(&article.author_id).cloned().flatten(),
                article,
                tags,
                comments,
            });
        }

        Ok(details)
    }
}

/// Order articles by `key`.
///
/// The sort is stable: `Title` and `Author` (email) ascend, `DateCreation`
/// puts the newest first. Articles without an author sort before the rest.
pub fn sort_order(mut articles: Vec<ArticleDetail>, key: SortKey) -> Vec<ArticleDetail> {
    match key {
        SortKey::Title => articles.sort_by(|a, b| a.article.title.cmp(&b.article.title)),
        SortKey::Author => articles.sort_by(|a, b| a.author_email().cmp(&b.author_email())),
        SortKey::DateCreation => {
            articles.sort_by(|a, b| b.article.created_at.cmp(&a.article.created_at))
        }
    }
    articles
}

/// Attached tags (selected) followed by the remaining tags (unselected),
/// keyed by tag id
pub fn tag_selection_union(attached: &[Tag], all: &[Tag]) -> Vec<TagSelection> {
    let mut seen = HashSet::new();
    let selected = attached.iter().map(|t| (t, true));
    let unselected = all.iter().map(|t| (t, false));

    selected
        .chain(unselected)
        .filter(|(tag, _)| seen.insert(tag.id))
        .map(|(tag, is_selected)| TagSelection::from_tag(tag, is_selected))
        .collect()
}

fn validate_article(title: &str, content: &str) -> Result<(String, String), ArticleServiceError> {
    let title = title.trim();
    let content = content.trim();

    if title.is_empty() {
        return Err(ArticleServiceError::ValidationError(
            "Title cannot be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ArticleServiceError::ValidationError(format!(
            "Title cannot exceed {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    if content.is_empty() {
        return Err(ArticleServiceError::ValidationError(
            "Content cannot be empty".to_string(),
        ));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(ArticleServiceError::ValidationError(format!(
            "Content cannot exceed {} characters",
            MAX_CONTENT_LENGTH
        )));
    }

    Ok((title.to_string(), content.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxArticleRepository, SqlxCommentRepository, SqlxTagRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    struct Fixture {
        service: ArticleService,
        tags: Arc<dyn TagRepository>,
        users: Arc<dyn UserRepository>,
        author_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::boxed(pool.clone());
        let tags = SqlxTagRepository::boxed(pool.clone());
        let author = users
            .create(&User::new(
                "author".to_string(),
                "author@example.com".to_string(),
                "hash".to_string(),
            ))
            .await
            .unwrap();

        let service = ArticleService::new(
            SqlxArticleRepository::boxed(pool.clone()),
            tags.clone(),
            SqlxCommentRepository::boxed(pool),
            users.clone(),
        );

        Fixture {
            service,
            tags,
            users,
            author_id: author.id,
        }
    }

    async fn add_tags(fx: &Fixture, names: &[&str]) -> Vec<Tag> {
        let mut created = Vec::new();
        for name in names {
            created.push(fx.tags.create(&Tag::new(name.to_string())).await.unwrap());
        }
        created
    }

    async fn create_article(fx: &Fixture, title: &str, tags: &[&str]) -> ArticleDetail {
        let mut input = CreateArticleInput::new(title, "Some content", fx.author_id);
        for tag in tags {
            input = input.with_tag(*tag, true);
        }
        fx.service.create(input, fx.author_id).await.unwrap()
    }

    fn edit_request(detail: &ArticleDetail, tags: Vec<TagSelection>) -> EditArticleRequest {
        EditArticleRequest {
            article_id: detail.article.id,
            title: detail.article.title.clone(),
            content: detail.article.content.clone(),
            tags,
            version: None,
        }
    }

    fn tag_names(detail: &ArticleDetail) -> Vec<String> {
        detail.tags.iter().map(|t| t.name.clone()).collect()
    }

    #[tokio::test]
    async fn test_create_attaches_only_checked_existing_tags() {
        let fx = setup().await;
        add_tags(&fx, &["Tag1"]).await;

        let input = CreateArticleInput::new("Title", "Content", fx.author_id)
            .with_tag("Tag1", true)
            .with_tag("Tag2", false);
        let detail = fx.service.create(input, fx.author_id).await.unwrap();

        assert_eq!(tag_names(&detail), vec!["Tag1"]);
        assert!(fx.tags.get_by_name("Tag2").await.unwrap().is_none());
        assert_eq!(detail.author.as_ref().unwrap().email, "author@example.com");
    }

    #[tokio::test]
    async fn test_create_skips_unknown_checked_tags() {
        let fx = setup().await;

        let detail = create_article(&fx, "Title", &["Nope"]).await;

        assert!(detail.tags.is_empty());
        assert!(fx.tags.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_grants_owner_claim() {
        let fx = setup().await;

        let detail = create_article(&fx, "Mine", &[]).await;

        let claims = fx.users.get_claims(fx.author_id).await.unwrap();
        assert!(claims
            .iter()
            .any(|c| c.is_article_owner_of(&detail.article.id.to_string())));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let fx = setup().await;

        let cases = [
            CreateArticleInput::new("", "Content", fx.author_id),
            CreateArticleInput::new("x".repeat(101), "Content", fx.author_id),
            CreateArticleInput::new("Title", "   ", fx.author_id),
            CreateArticleInput::new("Title", "x".repeat(1001), fx.author_id),
            CreateArticleInput::new("Title", "Content", fx.author_id + 100),
        ];
        for input in cases {
            assert!(matches!(
                fx.service.create(input, fx.author_id).await,
                Err(ArticleServiceError::ValidationError(_))
            ));
        }
        assert!(fx.service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_is_reported_as_creation_failed() {
        let fx = setup().await;

        // The acting user does not exist, so storing the ownership claim fails.
        let result = fx
            .service
            .create(CreateArticleInput::new("Title", "Content", fx.author_id), 9999)
            .await;

        assert!(matches!(result, Err(ArticleServiceError::CreationFailed)));
        assert!(fx.service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_swaps_tags() {
        let fx = setup().await;
        add_tags(&fx, &["A", "B"]).await;
        let detail = create_article(&fx, "Tagged", &["A"]).await;

        let request = edit_request(
            &detail,
            vec![TagSelection::new(0, "A", false), TagSelection::new(0, "B", true)],
        );
        let edited = fx.service.edit(request).await.unwrap();

        assert_eq!(tag_names(&edited), vec!["B"]);
        assert_eq!(edited.article.version, 2);
    }

    #[tokio::test]
    async fn test_edit_leaves_unmentioned_tags() {
        let fx = setup().await;
        add_tags(&fx, &["A", "B", "C"]).await;
        let detail = create_article(&fx, "Tagged", &["A", "B"]).await;

        let mut request = edit_request(&detail, vec![TagSelection::new(0, "C", true)]);
        request.title = "Renamed".to_string();
        let edited = fx.service.edit(request).await.unwrap();

        assert_eq!(edited.article.title, "Renamed");
        assert_eq!(tag_names(&edited), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_edit_is_idempotent() {
        let fx = setup().await;
        add_tags(&fx, &["A", "B", "C"]).await;
        let detail = create_article(&fx, "Tagged", &["A", "C"]).await;
        let selections = vec![
            TagSelection::new(0, "A", false),
            TagSelection::new(0, "B", true),
            TagSelection::new(0, "Missing", true),
        ];

        let once = fx
            .service
            .edit(edit_request(&detail, selections.clone()))
            .await
            .unwrap();
        let twice = fx
            .service
            .edit(edit_request(&detail, selections))
            .await
            .unwrap();

        assert_eq!(tag_names(&once), vec!["B", "C"]);
        assert_eq!(tag_names(&once), tag_names(&twice));
    }

    #[tokio::test]
    async fn test_edit_missing_article() {
        let fx = setup().await;
        let detail = create_article(&fx, "Soon gone", &[]).await;
        fx.service.delete(detail.article.id).await.unwrap();

        let result = fx.service.edit(edit_request(&detail, Vec::new())).await;

        assert!(matches!(result, Err(ArticleServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_edit_with_stale_version_conflicts() {
        let fx = setup().await;
        let detail = create_article(&fx, "Original", &[]).await;
        let stale = fx
            .service
            .get_edit_request_by_id(detail.article.id)
            .await
            .unwrap();

        let mut first = stale.clone();
        first.title = "First writer".to_string();
        fx.service.edit(first).await.unwrap();

        let mut second = stale;
        second.title = "Second writer".to_string();
        let result = fx.service.edit(second).await;

        assert!(matches!(result, Err(ArticleServiceError::Conflict(_))));
        let stored = fx.service.get_by_id(detail.article.id).await.unwrap().unwrap();
        assert_eq!(stored.article.title, "First writer");
    }

    #[tokio::test]
    async fn test_edit_request_union() {
        let fx = setup().await;
        add_tags(&fx, &["A", "B", "C"]).await;
        let detail = create_article(&fx, "Tagged", &["A"]).await;

        let request = fx
            .service
            .get_edit_request_by_id(detail.article.id)
            .await
            .unwrap();

        let flags: Vec<(&str, bool)> = request
            .tags
            .iter()
            .map(|t| (t.name.as_str(), t.is_selected))
            .collect();
        assert_eq!(flags, vec![("A", true), ("B", false), ("C", false)]);
        assert_eq!(request.version, Some(1));
        assert!(matches!(
            fx.service.get_edit_request_by_id(detail.article.id + 1).await,
            Err(ArticleServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_view_count() {
        let fx = setup().await;
        let detail = create_article(&fx, "Counted", &[]).await;
        let id = detail.article.id;

        assert!(fx.service.increment_view_count(id).await);
        let stored = fx.service.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.article.view_count, 1);
        assert_eq!(stored.article.title, detail.article.title);
        assert_eq!(stored.article.version, detail.article.version);

        assert!(fx.service.delete(id).await.unwrap());
        assert!(!fx.service.delete(id).await.unwrap());
        assert!(!fx.service.increment_view_count(id).await);
    }

    #[tokio::test]
    async fn test_list_page_and_author_listing() {
        let fx = setup().await;
        for title in ["Charlie", "Alpha", "Bravo"] {
            create_article(&fx, title, &[]).await;
        }

        let page = fx
            .service
            .list_page(&ListParams::new(1, 2), SortKey::Title)
            .await
            .unwrap();
        let titles: Vec<&str> = page.items.iter().map(|d| d.article.title.as_str()).collect();

        assert_eq!(titles, vec!["Alpha", "Bravo"]);
        assert_eq!(page.total, 3);
        assert!(page.has_next());
        assert_eq!(fx.service.get_by_author(fx.author_id).await.unwrap().len(), 3);
        assert!(fx.service.get_by_author(fx.author_id + 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tag_checkboxes_are_unchecked() {
        let fx = setup().await;
        add_tags(&fx, &["X", "Y"]).await;

        let boxes = fx.service.get_tag_checkboxes().await.unwrap();

        assert_eq!(boxes.len(), 2);
        assert!(boxes.iter().all(|b| !b.is_checked));
    }

    fn sample_detail(id: i64, title: &str, email: Option<&str>, minutes: i64) -> ArticleDetail {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
        ArticleDetail {
            article: Article {
                id,
                title: title.to_string(),
                content: "c".to_string(),
                author_id: 1,
                view_count: 0,
                version: 1,
                created_at: created,
                updated_at: created,
            },
            author: email.map(|e| AuthorSummary {
                id: 1,
                username: e.to_string(),
                email: e.to_string(),
            }),
            tags: Vec::new(),
            comments: Vec::new(),
        }
    }

    #[test]
    fn test_sort_by_author_puts_missing_author_first() {
        let sorted = sort_order(
            vec![
                sample_detail(1, "a", Some("zed@example.com"), 0),
                sample_detail(2, "b", None, 1),
                sample_detail(3, "c", Some("amy@example.com"), 2),
            ],
            SortKey::Author,
        );
        let ids: Vec<i64> = sorted.iter().map(|d| d.article.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_union_has_no_duplicates() {
        let tag = |id: i64, name: &str| Tag {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let attached = vec![tag(1, "A")];
        let all = vec![tag(1, "A"), tag(2, "B"), tag(3, "C")];

        let union = tag_selection_union(&attached, &all);

        assert_eq!(union.len(), 3);
        assert_eq!(union[0], TagSelection::new(1, "A", true));
        assert!(!union[1].is_selected && !union[2].is_selected);
    }

    fn arb_details() -> impl Strategy<Value = Vec<ArticleDetail>> {
        proptest::collection::vec(
            ("[a-e]{1,3}", proptest::option::of("[a-c]{1,2}@x"), 0i64..500),
            0..12,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (title, email, minutes))| {
                    sample_detail(i as i64, &title, email.as_deref(), minutes)
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn unknown_sort_key_matches_date_creation(articles in arb_details(), key in "[a-z]{4,10}") {
            prop_assume!(!key.eq_ignore_ascii_case("title") && !key.eq_ignore_ascii_case("author"));

            let by_default = sort_order(articles.clone(), SortKey::from(key.as_str()));
            let by_date = sort_order(articles, SortKey::DateCreation);

            let default_ids: Vec<i64> = by_default.iter().map(|d| d.article.id).collect();
            let date_ids: Vec<i64> = by_date.iter().map(|d| d.article.id).collect();
            prop_assert_eq!(default_ids, date_ids);
        }

        #[test]
        fn date_creation_is_descending(articles in arb_details()) {
            let sorted = sort_order(articles, SortKey::DateCreation);
            for pair in sorted.windows(2) {
                prop_assert!(pair[0].article.created_at >= pair[1].article.created_at);
            }
        }

        #[test]
        fn title_sort_is_ascending_permutation(articles in arb_details()) {
            let len = articles.len();
            let sorted = sort_order(articles, SortKey::Title);

            prop_assert_eq!(sorted.len(), len);
            for pair in sorted.windows(2) {
                prop_assert!(pair[0].article.title <= pair[1].article.title);
            }
        }
    }
}
