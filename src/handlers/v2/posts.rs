use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Extension,
};
use std::sync::Arc;

use super::reply;
use crate::api::ResponseFormat;
use crate::auth::AccessToken;
use crate::services::{posts, ListParams};
use crate::state::AppState;

/// GET /api/v2/posts
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    format: ResponseFormat,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Response {
    let result = match query {
        Ok(Query(params)) => posts::list_posts(&state, &params).await,
        Err(rejection) => Err(rejection.into()),
    };
    reply(format, StatusCode::OK, result)
}

/// GET /api/v2/posts/:id
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    format: ResponseFormat,
    Path(id): Path<String>,
) -> Response {
    reply(format, StatusCode::OK, posts::get_post(&state, &id).await)
}

/// POST /api/v2/posts
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
    format: ResponseFormat,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let result = posts::create_post(&state, &token, &headers, &body).await;
    reply(format, StatusCode::CREATED, result)
}

/// PUT /api/v2/posts/:id
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
    format: ResponseFormat,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let result = posts::update_post(&state, &token, &id, &headers, &body).await;
    reply(format, StatusCode::OK, result)
}

/// DELETE /api/v2/posts/:id
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
    format: ResponseFormat,
    Path(id): Path<String>,
) -> Response {
    let result = posts::delete_post(&state, &token, &id).await;
    reply(format, StatusCode::NO_CONTENT, result)
}
