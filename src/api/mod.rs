//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api/v1`:
//! - Article endpoints
//! - Tag endpoints
//! - Comment endpoints
//! - Role endpoints
//! - User and session endpoints

pub mod articles;
pub mod comments;
pub mod common;
pub mod middleware;
pub mod roles;
pub mod tags;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::db::repositories::{
    SqlxArticleRepository, SqlxCommentRepository, SqlxRoleRepository, SqlxSessionRepository,
    SqlxTagRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{ArticleService, CommentService, RoleService, TagService, UserService};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Wire repositories and services over one pool
pub fn build_state(
    pool: DynDatabasePool,
    page_size: u32,
    session_expiration_days: i64,
) -> AppState {
    let article_repo = SqlxArticleRepository::boxed(pool.clone());
    let tag_repo = SqlxTagRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let role_repo = SqlxRoleRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());

    let article_service = Arc::new(ArticleService::new(
        article_repo.clone(),
        tag_repo.clone(),
        comment_repo.clone(),
        user_repo.clone(),
    ));
    let tag_service = Arc::new(TagService::new(tag_repo));
    let comment_service = Arc::new(CommentService::new(comment_repo, article_repo));
    let user_service = Arc::new(
        UserService::new(user_repo, role_repo.clone(), session_repo)
            .with_session_expiration(session_expiration_days),
    );
    let role_service = Arc::new(RoleService::new(role_repo));

    AppState {
        article_service,
        tag_service,
        comment_service,
        user_service,
        role_service,
        page_size,
    }
}

/// Build the `/api/v1` router.
///
/// Identity is resolved for every request; each route group then applies
/// its own policy gate.
pub fn build_api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/articles", articles::router())
        .nest("/tags", tags::router())
        .nest("/comments", comments::router())
        .nest("/roles", roles::router())
        .nest("/users", users::router())
        .route_layer(axum_middleware::from_fn(middleware::log_user_activity))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::resolve_identity,
        ))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => tracing::warn!(origin = %cors_origin, error = %e, "Ignoring invalid CORS origin"),
    }

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    async fn setup_server() -> TestServer {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let state = build_state(pool, 5, 7);
        TestServer::new(build_router(state, "http://localhost:3000"))
            .expect("Failed to start test server")
    }

    /// Register and log in; returns the session token
    async fn sign_up(server: &TestServer, username: &str) -> String {
        let email = format!("{}@example.com", username);
        server
            .post("/api/v1/users/register")
            .json(&json!({ "username": username, "email": email, "password": "secret123" }))
            .await
            .assert_status(StatusCode::CREATED);

        let login: Value = server
            .post("/api/v1/users/login")
            .json(&json!({ "username_or_email": username, "password": "secret123" }))
            .await
            .json();
        login["token"].as_str().expect("token").to_string()
    }

    async fn create_article(server: &TestServer, token: &str, title: &str) -> i64 {
        let response = server
            .post("/api/v1/articles")
            .authorization_bearer(token)
            .json(&json!({ "title": title, "content": "Body text" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["id"].as_i64().expect("article id")
    }

    #[tokio::test]
    async fn test_public_article_index() {
        let server = setup_server().await;

        let response = server.get("/api/v1/articles").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 0);
        assert_eq!(body["per_page"], 5);
    }

    #[tokio::test]
    async fn test_create_article_requires_login() {
        let server = setup_server().await;

        let response = server
            .post("/api/v1/articles")
            .json(&json!({ "title": "T", "content": "C" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_invalid_token_is_anonymous() {
        let server = setup_server().await;

        server
            .get("/api/v1/users/me")
            .authorization_bearer("not-a-session")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/api/v1/articles")
            .authorization_bearer("not-a-session")
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_first_user_is_administrator() {
        let server = setup_server().await;
        let admin = sign_up(&server, "admin").await;
        let reader = sign_up(&server, "reader").await;

        let me: Value = server
            .get("/api/v1/users/me")
            .authorization_bearer(&admin)
            .await
            .json();
        assert_eq!(me["roles"], json!(["Administrator"]));

        let me: Value = server
            .get("/api/v1/users/me")
            .authorization_bearer(&reader)
            .await
            .json();
        assert_eq!(me["roles"], json!(["User"]));
    }

    #[tokio::test]
    async fn test_article_view_counts_and_missing_article() {
        let server = setup_server().await;
        let token = sign_up(&server, "writer").await;
        let id = create_article(&server, &token, "Counted").await;

        let body: Value = server.get(&format!("/api/v1/articles/{}", id)).await.json();
        assert_eq!(body["view_count"], 1);
        assert_eq!(body["author"]["username"], "writer");

        server
            .get("/api/v1/articles/9999")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_articles_by_author_empty_is_not_found() {
        let server = setup_server().await;
        let token = sign_up(&server, "writer").await;

        server
            .get("/api/v1/articles/author/1")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        create_article(&server, &token, "Mine").await;
        let articles: Value = server.get("/api/v1/articles/author/1").await.json();
        assert_eq!(articles.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_owner_policy_on_article_edit() {
        let server = setup_server().await;
        let admin = sign_up(&server, "admin").await;
        let owner = sign_up(&server, "owner").await;
        let stranger = sign_up(&server, "stranger").await;
        let id = create_article(&server, &owner, "Owned").await;

        server
            .get(&format!("/api/v1/articles/{}/edit", id))
            .authorization_bearer(&stranger)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let form: Value = server
            .get(&format!("/api/v1/articles/{}/edit", id))
            .authorization_bearer(&owner)
            .await
            .json();
        assert_eq!(form["article_id"], id);

        let edit = json!({ "article_id": id, "title": "Renamed", "content": "New body" });
        server
            .put(&format!("/api/v1/articles/{}", id))
            .authorization_bearer(&owner)
            .json(&edit)
            .await
            .assert_status_ok();

        // Moderation rights come from the role, not from ownership
        server
            .delete(&format!("/api/v1/articles/{}", id))
            .authorization_bearer(&stranger)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&format!("/api/v1/articles/{}", id))
            .authorization_bearer(&admin)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&format!("/api/v1/articles/{}", id))
            .authorization_bearer(&admin)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_article_update_id_mismatch_and_stale_version() {
        let server = setup_server().await;
        let token = sign_up(&server, "admin").await;
        let id = create_article(&server, &token, "Original").await;

        server
            .put(&format!("/api/v1/articles/{}", id))
            .authorization_bearer(&token)
            .json(&json!({ "article_id": id + 1, "title": "T", "content": "C" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let stale = json!({ "article_id": id, "title": "T", "content": "C", "version": 1 });
        server
            .put(&format!("/api/v1/articles/{}", id))
            .authorization_bearer(&token)
            .json(&stale)
            .await
            .assert_status_ok();
        server
            .put(&format!("/api/v1/articles/{}", id))
            .authorization_bearer(&token)
            .json(&stale)
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_tag_endpoints() {
        let server = setup_server().await;
        let admin = sign_up(&server, "admin").await;
        let user = sign_up(&server, "user1").await;

        let response = server
            .post("/api/v1/tags")
            .authorization_bearer(&user)
            .json(&json!({ "name": "rust" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let tag_id = response.json::<Value>()["id"].as_i64().expect("tag id");

        let duplicate = server
            .post("/api/v1/tags")
            .authorization_bearer(&user)
            .json(&json!({ "name": "rust" }))
            .await;
        duplicate.assert_status(StatusCode::CONFLICT);
        assert_eq!(duplicate.json::<Value>()["error"]["code"], "DUPLICATE_NAME");

        server
            .delete(&format!("/api/v1/tags/{}", tag_id))
            .authorization_bearer(&user)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let tags: Value = server.get("/api/v1/tags").await.json();
        assert_eq!(tags[0]["name"], "rust");
        assert_eq!(tags[0]["article_count"], 0);

        server
            .delete(&format!("/api/v1/tags/{}", tag_id))
            .authorization_bearer(&admin)
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_comment_edit_rights() {
        let server = setup_server().await;
        let admin = sign_up(&server, "admin").await;
        let author = sign_up(&server, "author").await;
        let other = sign_up(&server, "other").await;
        let article_id = create_article(&server, &admin, "Discussed").await;

        let response = server
            .post("/api/v1/comments")
            .authorization_bearer(&author)
            .json(&json!({ "article_id": article_id, "content": "First!" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let comment_id = response.json::<Value>()["id"].as_i64().expect("comment id");

        let edit = json!({ "comment_id": comment_id, "article_id": article_id, "content": "Edited" });
        server
            .put(&format!("/api/v1/comments/{}", comment_id))
            .authorization_bearer(&other)
            .json(&edit)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .put(&format!("/api/v1/comments/{}", comment_id))
            .authorization_bearer(&author)
            .json(&edit)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let comments: Value = server
            .get(&format!("/api/v1/comments/article/{}", article_id))
            .authorization_bearer(&other)
            .await
            .json();
        assert_eq!(comments[0]["content"], "Edited");

        server
            .delete(&format!("/api/v1/comments/{}", comment_id))
            .authorization_bearer(&author)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&format!("/api/v1/comments/{}", comment_id))
            .authorization_bearer(&admin)
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_comment_and_single_tag_reads_require_login() {
        let server = setup_server().await;
        let admin = sign_up(&server, "admin").await;
        let article_id = create_article(&server, &admin, "Quiet").await;
        let tag = server
            .post("/api/v1/tags")
            .authorization_bearer(&admin)
            .json(&json!({ "name": "news" }))
            .await;
        tag.assert_status(StatusCode::CREATED);
        let tag_id = tag.json::<Value>()["id"].as_i64().expect("tag id");

        server
            .get("/api/v1/comments")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/api/v1/comments/1")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get(&format!("/api/v1/comments/article/{}", article_id))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get(&format!("/api/v1/tags/{}", tag_id))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server.get("/api/v1/tags").await.assert_status_ok();
        server
            .get(&format!("/api/v1/articles/{}", article_id))
            .await
            .assert_status_ok();

        server
            .get("/api/v1/comments")
            .authorization_bearer(&admin)
            .await
            .assert_status_ok();
        let fetched: Value = server
            .get(&format!("/api/v1/tags/{}", tag_id))
            .authorization_bearer(&admin)
            .await
            .json();
        assert_eq!(fetched["name"], "news");
    }

    #[tokio::test]
    async fn test_admin_only_user_and_role_management() {
        let server = setup_server().await;
        let admin = sign_up(&server, "admin").await;
        let user = sign_up(&server, "member").await;

        server
            .get("/api/v1/roles")
            .authorization_bearer(&user)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let roles: Value = server
            .get("/api/v1/roles")
            .authorization_bearer(&admin)
            .await
            .json();
        assert_eq!(roles.as_array().map(Vec::len), Some(3));

        server
            .post("/api/v1/users/2/roles/Moderator")
            .authorization_bearer(&admin)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let member_roles: Value = server
            .get("/api/v1/users/2/roles")
            .authorization_bearer(&admin)
            .await
            .json();
        assert_eq!(member_roles, json!(["Moderator", "User"]));

        let form: Value = server
            .get("/api/v1/users/2")
            .authorization_bearer(&admin)
            .await
            .json();
        assert_eq!(form["roles"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let server = setup_server().await;
        let token = sign_up(&server, "leaver").await;

        server
            .post("/api/v1/users/logout")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get("/api/v1/users/me")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let server = setup_server().await;
        sign_up(&server, "someone").await;

        server
            .post("/api/v1/users/login")
            .json(&json!({ "username_or_email": "someone", "password": "wrong-pass" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
