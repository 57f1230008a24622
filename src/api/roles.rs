//! Role API endpoints (Administrator only)
//!
//! - GET /api/v1/roles, POST /api/v1/roles
//! - GET /api/v1/roles/{id}, PUT /api/v1/roles/{id}, DELETE /api/v1/roles/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};

use crate::api::common::ensure_same_id;
use crate::api::middleware::{self, ApiError, AppState};
use crate::models::{CreateRoleInput, EditRoleRequest, Role};

/// Build the roles router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/{id}", get(get_role).put(update_role).delete(delete_role))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
}

async fn list_roles(State(state): State<AppState>) -> Result<Json<Vec<Role>>, ApiError> {
    Ok(Json(state.role_service.list().await?))
}

async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Role>, ApiError> {
    let role = state
        .role_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Role not found: {}", id)))?;
    Ok(Json(role))
}

async fn create_role(
    State(state): State<AppState>,
    Json(body): Json<CreateRoleInput>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    let role = state.role_service.create(&body.name, body.description).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<EditRoleRequest>,
) -> Result<Json<Role>, ApiError> {
    ensure_same_id(id, body.id)?;
    Ok(Json(
        state
            .role_service
            .update(id, &body.name, body.description)
            .await?,
    ))
}

async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.role_service.delete(id).await? {
        return Err(ApiError::not_found(format!("Role not found: {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
