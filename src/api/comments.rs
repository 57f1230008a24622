//! Comment API endpoints (all require a session)
//!
//! - GET /api/v1/comments - All comments
//! - GET /api/v1/comments/{id} - One comment
//! - GET /api/v1/comments/article/{article_id} - Comments under an article
//! - POST /api/v1/comments - Post a comment as the caller
//! - PUT /api/v1/comments/{id} - Edit (author, Administrator or Moderator)
//! - DELETE /api/v1/comments/{id} - Delete (Administrator)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    routing::{delete, get},
    Json, Router,
};

use crate::api::common::ensure_same_id;
use crate::api::middleware::{self, ApiError, AppState, AuthenticatedUser};
use crate::models::{Comment, CreateCommentInput, EditCommentRequest};

/// Build the comments router
pub fn router() -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/{id}", delete(delete_comment))
        .route_layer(axum_middleware::from_fn(middleware::require_admin));

    let protected_routes = Router::new()
        .route("/", get(list_comments).post(create_comment))
        .route("/{id}", get(get_comment).put(update_comment))
        .route("/article/{article_id}", get(list_for_article))
        .route_layer(axum_middleware::from_fn(middleware::require_auth));

    Router::new().merge(admin_routes).merge(protected_routes)
}

/// GET /api/v1/comments
async fn list_comments(State(state): State<AppState>) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.comment_service.list_all().await?))
}

/// GET /api/v1/comments/{id}
async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Comment>, ApiError> {
    let comment = state
        .comment_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Comment not found: {}", id)))?;
    Ok(Json(comment))
}

/// GET /api/v1/comments/article/{article_id}
async fn list_for_article(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.comment_service.list_for_article(article_id).await?))
}

/// POST /api/v1/comments
async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = state
        .comment_service
        .create(body.article_id, user.principal.user_id, body.title, &body.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// PUT /api/v1/comments/{id}
///
/// Only the comment's author or staff may edit it.
async fn update_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<EditCommentRequest>,
) -> Result<StatusCode, ApiError> {
    ensure_same_id(id, body.comment_id)?;

    let existing = state
        .comment_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Comment not found: {}", id)))?;

    if existing.author_id != user.principal.user_id && !user.principal.is_staff() {
        return Err(ApiError::forbidden("Only the author may edit this comment"));
    }

    state
        .comment_service
        .update(id, body.title, &body.content)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/comments/{id}
async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.comment_service.delete(id).await? {
        return Err(ApiError::not_found(format!("Comment not found: {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
