//! API middleware
//!
//! Contains middleware for:
//! - Identity (session token to `Principal`)
//! - Authorization (policy gates per route group)
//! - User activity logging

use axum::{
    extract::{FromRequestParts, MatchedPath, RawPathParams, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;

use crate::services::{
    evaluate, ArticleService, ArticleServiceError, CommentService, CommentServiceError, Decision,
    Policy, Principal, RoleService, RoleServiceError, TagService, TagServiceError, UserService,
    UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub article_service: Arc<ArticleService>,
    pub tag_service: Arc<TagService>,
    pub comment_service: Arc<CommentService>,
    pub user_service: Arc<UserService>,
    pub role_service: Arc<RoleService>,
    /// Articles per page on `GET /articles`
    pub page_size: u32,
}

/// The caller behind a valid session token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub principal: Principal,
    /// Session token the request was made with
    pub token: String,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_details(
            "DUPLICATE_NAME",
            format!("Name already exists: {}", name),
            serde_json::json!({ "field": "name", "value": name }),
        )
    }

    /// Log `cause` and return the generic 500 body
    pub fn internal_error(cause: impl Display) -> Self {
        tracing::error!(error = %cause, "Request failed");
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" | "DUPLICATE_NAME" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::NotFound(id) => Self::not_found(format!("Article not found: {}", id)),
            ArticleServiceError::ValidationError(msg) => Self::validation_error(msg),
            ArticleServiceError::Conflict(msg) => Self::conflict(msg),
            e @ ArticleServiceError::CreationFailed => Self::internal_error(e),
            ArticleServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::NotFound(id) => Self::not_found(format!("Tag not found: {}", id)),
            TagServiceError::ValidationError(msg) => Self::validation_error(msg),
            TagServiceError::DuplicateName(name) => Self::duplicate_name(name),
            e @ TagServiceError::UpdateFailed(_) => Self::internal_error(e),
            TagServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::NotFound(what) => Self::not_found(format!("Not found: {}", what)),
            CommentServiceError::ValidationError(msg) => Self::validation_error(msg),
            CommentServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<RoleServiceError> for ApiError {
    fn from(err: RoleServiceError) -> Self {
        match err {
            RoleServiceError::NotFound(id) => Self::not_found(format!("Role not found: {}", id)),
            RoleServiceError::ValidationError(msg) => Self::validation_error(msg),
            RoleServiceError::DuplicateName(name) => Self::duplicate_name(name),
            RoleServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => Self::unauthorized(msg),
            UserServiceError::SessionExpired => Self::unauthorized("Session expired"),
            UserServiceError::ValidationError(msg) => Self::validation_error(msg),
            UserServiceError::InvalidResetToken => {
                Self::validation_error("Invalid password reset token")
            }
            UserServiceError::NotFound(what) => Self::not_found(format!("Not found: {}", what)),
            UserServiceError::UserExists(msg) => Self::conflict(msg),
            UserServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

/// Extract session token from request
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Identity middleware.
///
/// Attaches an `AuthenticatedUser` when the request carries a live session
/// token. Requests without one pass through anonymously; the policy gates
/// decide whether that is acceptable.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(&request) {
        match load_identity(&state, &token).await {
            Ok(Some(principal)) => {
                request
                    .extensions_mut()
                    .insert(AuthenticatedUser { principal, token });
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Session lookup failed, continuing anonymously"),
        }
    }
    next.run(request).await
}

async fn load_identity(
    state: &AppState,
    token: &str,
) -> Result<Option<Principal>, UserServiceError> {
    let Some(user) = state.user_service.validate_session(token).await? else {
        return Ok(None);
    };
    state.user_service.load_principal(&user).await.map(Some)
}

async fn authorize(
    policy: Policy,
    params: &RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| &user.principal);
    let route_id = params.iter().find(|(key, _)| *key == "id").map(|(_, value)| value);

    match evaluate(policy, principal, route_id) {
        Decision::Allow => Ok(next.run(request).await),
        Decision::Unauthenticated => Err(ApiError::unauthorized("Authentication required")),
        Decision::Forbidden => Err(ApiError::forbidden(format!(
            "Access denied by policy {:?}",
            policy
        ))),
    }
}

/// Any signed-in user
pub async fn require_auth(
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(Policy::Authenticated, &params, request, next).await
}

/// Owner of the article in the `{id}` segment, or an Administrator/Moderator
pub async fn require_owner_or_staff(
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(Policy::OwnerOrAdminOrModerator, &params, request, next).await
}

pub async fn require_staff(
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(Policy::AdministratorOrModerator, &params, request, next).await
}

pub async fn require_admin(
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(Policy::Administrator, &params, request, next).await
}

/// Log who called which route, before and after the handler runs.
pub async fn log_user_activity(
    matched_path: MatchedPath,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Response {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.principal.username.clone())
        .unwrap_or_else(|| "anonymous".to_string());
    let method = request.method().clone();
    let route = matched_path.as_str().to_string();
    let route_params = format_route_params(&params);

    tracing::info!(
        target: "user_activity",
        user = %user,
        method = %method,
        route = %route,
        params = %route_params,
        "Executing action"
    );

    let response = next.run(request).await;

    tracing::info!(
        target: "user_activity",
        user = %user,
        method = %method,
        route = %route,
        params = %route_params,
        status = response.status().as_u16(),
        "Executed action"
    );

    response
}

/// `key = value` pairs joined with `, `
fn format_route_params(params: &RawPathParams) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{} = {}", key, value))
        .collect::<Vec<_>>()
        .join(", ")
}
