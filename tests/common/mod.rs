#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::{Form, Query},
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use blogrest::auth::{encode_token, AccessToken};
use blogrest::config::{AppConfig, StorageBackend};
use blogrest::database::models::{
    AuthProvider, AuthProviderType, Comment, NewAuthProvider, NewComment, NewPost, NewUser, Post,
    User, UserRole,
};
use blogrest::database::{
    CommentFilter, DatabaseError, MemoryStore, Page, PostFilter, Store,
};
use blogrest::state::AppState;

pub const SECRET: &str = "integration-test-secret";
pub const OAUTH_STATE: &str = "state-123";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.database.backend = StorageBackend::Memory;
    config.security.hmac_secret = SECRET.to_string();
    for provider in [
        &mut config.oauth.google,
        &mut config.oauth.facebook,
        &mut config.oauth.github,
    ] {
        provider.client_id = "client-id".to_string();
        provider.client_secret = "client-secret".to_string();
        provider.client_state = OAUTH_STATE.to_string();
        provider.redirect_url = "http://localhost:8000/callback".to_string();
    }
    config
}

/// The real router over an in-memory store, driven in-process
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).with_context(|| format!("body is not json: {}", self.text()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let state = Arc::new(AppState::new(config, store));
        Self {
            router: blogrest::app(state.clone()),
            state,
        }
    }

    pub fn token(&self, user_id: Uuid) -> String {
        let claims = AccessToken::new(user_id, UserRole::User, &self.state.config.security);
        encode_token(&claims, SECRET).expect("token signs")
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok(TestResponse { status, headers, body })
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.call(Method::GET, uri, None, None).await
    }

    /// Create a post through the API and return its id
    pub async fn create_post(&self, version: &str, token: &str, title: &str) -> Result<String> {
        let res = self
            .call(
                Method::POST,
                &format!("/api/{}/posts", version),
                Some(token),
                Some(json!({ "title": title, "body": format!("{} body", title) })),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create post failed: {}", res.text());
        Ok(res.json()?["post"]["id"]
            .as_str()
            .context("post id missing")?
            .to_string())
    }

    pub async fn create_comment(
        &self,
        version: &str,
        token: &str,
        post_id: &str,
        name: &str,
    ) -> Result<String> {
        let res = self
            .call(
                Method::POST,
                &format!("/api/{}/comments", version),
                Some(token),
                Some(json!({ "postId": post_id, "name": name, "body": "nice post" })),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create comment failed: {}", res.text());
        Ok(res.json()?["comment"]["id"]
            .as_str()
            .context("comment id missing")?
            .to_string())
    }
}

/// Throwaway OAuth provider answering token and userinfo calls.
///
/// Codes: `good` issues `at-good`, `noemail` issues `at-noemail`,
/// anything else fails the exchange.
pub struct MockProvider {
    pub base_url: String,
}

impl MockProvider {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;

        let router = Router::new()
            .route("/token", post(token_endpoint))
            .route("/google/userinfo", get(google_userinfo))
            .route("/facebook/me", get(facebook_me))
            .route("/github/user", get(github_user));

        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
        })
    }

    /// Point every provider at this mock
    pub fn configure(&self, config: &mut AppConfig) {
        let base = &self.base_url;
        for (provider, userinfo) in [
            (&mut config.oauth.google, "google/userinfo"),
            (&mut config.oauth.facebook, "facebook/me"),
            (&mut config.oauth.github, "github/user"),
        ] {
            provider.auth_url = format!("{}/authorize", base);
            provider.token_url = format!("{}/token", base);
            provider.userinfo_url = format!("{}/{}", base, userinfo);
        }
    }
}

async fn token_endpoint(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
    let valid_client = form.get("client_id").map(String::as_str) == Some("client-id")
        && form.get("client_secret").map(String::as_str) == Some("client-secret")
        && form.get("grant_type").map(String::as_str) == Some("authorization_code");

    match form.get("code").map(String::as_str) {
        Some(code @ ("good" | "noemail")) if valid_client => (
            StatusCode::OK,
            Json(json!({
                "access_token": format!("at-{}", code),
                "refresh_token": "rt-google",
                "token_type": "bearer",
            })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        ),
    }
}

async fn google_userinfo(Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
    match query.get("access_token").map(String::as_str) {
        Some("at-good") => (
            StatusCode::OK,
            Json(json!({ "id": "g-1", "email": "ada@example.com", "picture": "https://img/ada.png" })),
        ),
        Some("at-noemail") => (StatusCode::OK, Json(json!({ "id": "g-2", "email": "" }))),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid token" }))),
    }
}

async fn facebook_me(Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
    if query.get("fields").map(String::as_str) != Some("id,name,email") {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "fields missing" })));
    }
    match query.get("access_token").map(String::as_str) {
        Some("at-good") => (
            StatusCode::OK,
            Json(json!({ "id": "fb-1", "name": "Ada Lovelace", "email": "ada@example.com" })),
        ),
        Some("at-noemail") => (StatusCode::OK, Json(json!({ "id": "fb-2", "name": "Nobody" }))),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid token" }))),
    }
}

async fn github_user(headers: HeaderMap) -> impl IntoResponse {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if headers.get(header::USER_AGENT).is_none() {
        return (StatusCode::FORBIDDEN, Json(json!({ "message": "user agent required" })));
    }
    match auth {
        "Bearer at-good" => (
            StatusCode::OK,
            Json(json!({
                "id": 4242,
                "login": "ada",
                "name": null,
                "email": "ada@example.com",
                "avatar_url": "https://avatars/ada.png"
            })),
        ),
        "Bearer at-noemail" => (
            StatusCode::OK,
            Json(json!({ "id": 4243, "login": "ghost", "name": "Ghost", "email": null })),
        ),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Bad credentials" }))),
    }
}

/// Store whose backend is unreachable: every call times out.
pub struct UnavailableStore;

fn unavailable<T>() -> Result<T, DatabaseError> {
    Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl Store for UnavailableStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        unavailable()
    }

    async fn list_posts(&self, _: &PostFilter, _: Page) -> Result<(Vec<Post>, i64), DatabaseError> {
        unavailable()
    }

    async fn find_post(&self, _: Uuid) -> Result<Option<Post>, DatabaseError> {
        unavailable()
    }

    async fn create_post(&self, _: NewPost) -> Result<Post, DatabaseError> {
        unavailable()
    }

    async fn update_post(&self, _: Uuid, _: &str, _: &str) -> Result<Option<Post>, DatabaseError> {
        unavailable()
    }

    async fn delete_post(&self, _: Uuid) -> Result<bool, DatabaseError> {
        unavailable()
    }

    async fn list_comments(
        &self,
        _: &CommentFilter,
        _: Page,
    ) -> Result<(Vec<Comment>, i64), DatabaseError> {
        unavailable()
    }

    async fn find_comment(&self, _: Uuid) -> Result<Option<Comment>, DatabaseError> {
        unavailable()
    }

    async fn create_comment(&self, _: NewComment) -> Result<Comment, DatabaseError> {
        unavailable()
    }

    async fn update_comment(
        &self,
        _: Uuid,
        _: &str,
        _: &str,
    ) -> Result<Option<Comment>, DatabaseError> {
        unavailable()
    }

    async fn delete_comment(&self, _: Uuid) -> Result<bool, DatabaseError> {
        unavailable()
    }

    async fn find_user(&self, _: Uuid) -> Result<Option<User>, DatabaseError> {
        unavailable()
    }

    async fn find_user_by_email(&self, _: &str) -> Result<Option<User>, DatabaseError> {
        unavailable()
    }

    async fn create_user(&self, _: NewUser) -> Result<User, DatabaseError> {
        unavailable()
    }

    async fn find_auth_provider(
        &self,
        _: Uuid,
        _: &str,
        _: AuthProviderType,
    ) -> Result<Option<AuthProvider>, DatabaseError> {
        unavailable()
    }

    async fn create_auth_provider(&self, _: NewAuthProvider) -> Result<AuthProvider, DatabaseError> {
        unavailable()
    }

    async fn update_auth_provider_token(&self, _: Uuid, _: &str) -> Result<(), DatabaseError> {
        unavailable()
    }
}
