//! User and session API endpoints
//!
//! Public:
//! - POST /api/v1/users/login - Open a session
//! - POST /api/v1/users/register - Self-registration
//!
//! Authenticated:
//! - POST /api/v1/users/logout
//! - GET /api/v1/users/me
//!
//! Administrator:
//! - GET/POST /api/v1/users
//! - GET/PUT/DELETE /api/v1/users/{id}
//! - GET /api/v1/users/{id}/roles
//! - POST/DELETE /api/v1/users/{id}/roles/{role_name}

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::common::ensure_same_id;
use crate::api::middleware::{self, ApiError, AppState, AuthenticatedUser};
use crate::models::{EditUserRequest, UserEditView, UserView};
use crate::services::{LoginInput, RegisterInput};

/// Response body of a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

/// Build the users router
pub fn router() -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/{id}/roles", get(get_user_roles))
        .route(
            "/{id}/roles/{role_name}",
            post(add_user_to_role).delete(remove_user_from_role),
        )
        .route_layer(axum_middleware::from_fn(middleware::require_admin));

    let protected_routes = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
        .route_layer(axum_middleware::from_fn(middleware::require_auth));

    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .merge(protected_routes)
        .merge(admin_routes)
}

/// POST /api/v1/users/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.user_service.login(body).await?;

    let user = state
        .user_service
        .get_user_view(session.user_id)
        .await?
        .ok_or_else(|| ApiError::internal_error("Session user vanished after login"))?;

    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id, max_age
    );
    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(ApiError::internal_error)?,
    );

    Ok((
        response_headers,
        Json(LoginResponse {
            token: session.id,
            expires_at: session.expires_at,
            user,
        }),
    ))
}

/// POST /api/v1/users/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    create_user_view(&state, body).await
}

/// POST /api/v1/users/logout
async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    state.user_service.logout(&user.token).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/v1/users/me
async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserView>, ApiError> {
    let view = state
        .user_service
        .get_user_view(user.principal.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;
    Ok(Json(view))
}

/// GET /api/v1/users
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserView>>, ApiError> {
    Ok(Json(state.user_service.get_users_view().await?))
}

/// POST /api/v1/users - Administrator creates an account
async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    create_user_view(&state, body).await
}

async fn create_user_view(
    state: &AppState,
    input: RegisterInput,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let user = state.user_service.register(input).await?;
    let roles = state.user_service.get_roles(user.id).await?;
    Ok((StatusCode::CREATED, Json(UserView::new(user, roles))))
}

/// GET /api/v1/users/{id} - Edit view
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserEditView>, ApiError> {
    let view = state
        .user_service
        .get_user_edit_view(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User not found: {}", id)))?;
    Ok(Json(view))
}

/// PUT /api/v1/users/{id}
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<EditUserRequest>,
) -> Result<Json<UserView>, ApiError> {
    ensure_same_id(id, body.id)?;
    Ok(Json(state.user_service.update_user(body).await?))
}

/// DELETE /api/v1/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.user_service.delete_user(id).await? {
        return Err(ApiError::not_found(format!("User not found: {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/users/{id}/roles
async fn get_user_roles(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.user_service.get_roles(id).await?))
}

/// POST /api/v1/users/{id}/roles/{role_name}
async fn add_user_to_role(
    State(state): State<AppState>,
    Path((id, role_name)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
    state.user_service.add_to_role(id, &role_name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/users/{id}/roles/{role_name}
async fn remove_user_from_role(
    State(state): State<AppState>,
    Path((id, role_name)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
    if !state.user_service.remove_from_role(id, &role_name).await? {
        return Err(ApiError::not_found(format!(
            "User {} is not in role {}",
            id, role_name
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
