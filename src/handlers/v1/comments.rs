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
use crate::services::{comments, ListParams};
use crate::state::AppState;

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    format: ResponseFormat,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Response {
    let result = match query {
        Ok(Query(params)) => comments::list_comments(&state, &params).await,
        Err(rejection) => Err(rejection.into()),
    };
    reply(format, StatusCode::OK, result)
}

pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    format: ResponseFormat,
    Path(id): Path<String>,
) -> Response {
    reply(format, StatusCode::OK, comments::get_comment(&state, &id).await)
}

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
    format: ResponseFormat,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let result = comments::create_comment(&state, &token, &headers, &body).await;
    reply(format, StatusCode::CREATED, result)
}

pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
    format: ResponseFormat,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let result = comments::update_comment(&state, &token, &id, &headers, &body).await;
    reply(format, StatusCode::OK, result)
}

pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
    format: ResponseFormat,
    Path(id): Path<String>,
) -> Response {
    let result = comments::delete_comment(&state, &token, &id).await;
    reply(format, StatusCode::OK, result)
}
