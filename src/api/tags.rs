//! Tag API endpoints
//!
//! - GET /api/v1/tags - Tags with article counts (public)
//! - GET /api/v1/tags/{id} - One tag
//! - POST /api/v1/tags - Create tag
//! - PUT /api/v1/tags/{id} - Rename tag (Administrator or Moderator)
//! - DELETE /api/v1/tags/{id} - Delete tag (Administrator or Moderator)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::ensure_same_id;
use crate::api::middleware::{self, ApiError, AppState};
use crate::models::{Tag, TagWithCount};

/// Request body for creating a tag
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
}

/// Request body for renaming a tag
#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    pub id: i64,
    pub name: String,
}

/// Build the tags router
pub fn router() -> Router<AppState> {
    let staff_routes = Router::new()
        .route("/{id}", axum::routing::put(update_tag).delete(delete_tag))
        .route_layer(axum_middleware::from_fn(middleware::require_staff));

    let protected_routes = Router::new()
        .route("/", post(create_tag))
        .route("/{id}", get(get_tag))
        .route_layer(axum_middleware::from_fn(middleware::require_auth));

    Router::new()
        .route("/", get(list_tags))
        .merge(staff_routes)
        .merge(protected_routes)
}

/// GET /api/v1/tags - List tags with counts
async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagWithCount>>, ApiError> {
    Ok(Json(state.tag_service.list_with_counts().await?))
}

/// GET /api/v1/tags/{id}
async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Tag>, ApiError> {
    let tag = state
        .tag_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Tag not found: {}", id)))?;
    Ok(Json(tag))
}

/// POST /api/v1/tags
async fn create_tag(
    State(state): State<AppState>,
    Json(body): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let tag = state.tag_service.insert(&body.name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// PUT /api/v1/tags/{id}
async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTagRequest>,
) -> Result<Json<Tag>, ApiError> {
    ensure_same_id(id, body.id)?;
    Ok(Json(state.tag_service.update(id, &body.name).await?))
}

/// DELETE /api/v1/tags/{id}
async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.tag_service.delete(id).await? {
        return Err(ApiError::not_found(format!("Tag not found: {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
