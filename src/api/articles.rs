//! Article API endpoints
//!
//! - GET /api/v1/articles - Paged, sorted article index
//! - GET /api/v1/articles/{id} - Article with author, tags and comments
//! - GET /api/v1/articles/author/{author_id} - Articles of one author
//! - GET /api/v1/articles/tags - Tag checkboxes for the new-article form
//! - GET /api/v1/articles/{id}/edit - Edit form with tag selection
//! - POST /api/v1/articles - Create article
//! - PUT /api/v1/articles/{id} - Edit article
//! - DELETE /api/v1/articles/{id} - Delete article

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{ensure_same_id, ArticleListQuery, PageResponse};
use crate::api::middleware::{self, ApiError, AppState, AuthenticatedUser};
use crate::models::{
    ArticleDetail, CreateArticleInput, EditArticleRequest, ListParams, SortKey, TagCheckbox,
};

/// Request body for creating an article
#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<TagCheckbox>,
}

/// Build the articles router
pub fn router() -> Router<AppState> {
    let owner_routes = Router::new()
        .route("/{id}", axum::routing::put(update_article).delete(delete_article))
        .route("/{id}/edit", get(get_edit_request))
        .route_layer(axum_middleware::from_fn(middleware::require_owner_or_staff));

    let protected_routes = Router::new()
        .route("/", axum::routing::post(create_article))
        .route("/tags", get(get_tag_checkboxes))
        .route_layer(axum_middleware::from_fn(middleware::require_auth));

    Router::new()
        .route("/", get(list_articles))
        .route("/{id}", get(get_article))
        .route("/author/{author_id}", get(list_by_author))
        .merge(owner_routes)
        .merge(protected_routes)
}

/// GET /api/v1/articles - List articles
async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ArticleListQuery>,
) -> Result<Json<PageResponse<ArticleDetail>>, ApiError> {
    let params = ListParams::new(query.page, state.page_size);
    let sort = SortKey::from(query.sort.as_deref().unwrap_or_default());

    let result = state.article_service.list_page(&params, sort).await?;
    Ok(Json(result.into()))
}

/// GET /api/v1/articles/{id} - Get article, counting the view
async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ArticleDetail>, ApiError> {
    state.article_service.increment_view_count(id).await;

    let article = state
        .article_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Article not found: {}", id)))?;

    Ok(Json(article))
}

/// GET /api/v1/articles/author/{author_id} - Articles by one author
async fn list_by_author(
    State(state): State<AppState>,
    Path(author_id): Path<i64>,
) -> Result<Json<Vec<ArticleDetail>>, ApiError> {
    let articles = state.article_service.get_by_author(author_id).await?;
    if articles.is_empty() {
        return Err(ApiError::not_found(format!(
            "No articles found for author {}",
            author_id
        )));
    }
    Ok(Json(articles))
}

/// GET /api/v1/articles/tags - Tag checkboxes for a new article
async fn get_tag_checkboxes(
    State(state): State<AppState>,
) -> Result<Json<Vec<TagCheckbox>>, ApiError> {
    Ok(Json(state.article_service.get_tag_checkboxes().await?))
}

/// GET /api/v1/articles/{id}/edit - Edit form
async fn get_edit_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EditArticleRequest>, ApiError> {
    Ok(Json(state.article_service.get_edit_request_by_id(id).await?))
}

/// POST /api/v1/articles - Create article as the caller
async fn create_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<ArticleDetail>), ApiError> {
    let author_id = user.principal.user_id;
    let input = CreateArticleInput {
        title: body.title,
        content: body.content,
        author_id,
        tags: body.tags,
    };

    let article = state.article_service.create(input, author_id).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// PUT /api/v1/articles/{id} - Apply an edit request
async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<EditArticleRequest>,
) -> Result<Json<ArticleDetail>, ApiError> {
    ensure_same_id(id, body.article_id)?;
    Ok(Json(state.article_service.edit(body).await?))
}

/// DELETE /api/v1/articles/{id} - Delete article
async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.article_service.delete(id).await? {
        return Err(ApiError::not_found(format!("Article not found: {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
