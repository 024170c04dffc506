use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use std::sync::Arc;

use super::reply;
use crate::api::ResponseFormat;
use crate::auth::oauth::ProviderKind;
use crate::auth::AccessToken;
use crate::services::accounts::{self, CallbackParams};
use crate::state::AppState;

fn login(state: &AppState, kind: ProviderKind, format: ResponseFormat) -> Response {
    match accounts::login_url(state, kind) {
        Ok(url) => Redirect::temporary(url.as_str()).into_response(),
        Err(err) => err.negotiated(format),
    }
}

async fn callback(
    state: &AppState,
    kind: ProviderKind,
    format: ResponseFormat,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> Response {
    let result = match query {
        Ok(Query(params)) => accounts::complete_login(state, kind, &params).await,
        Err(rejection) => Err(rejection.into()),
    };
    reply(format, StatusCode::OK, result)
}

/// GET /api/v2/auth/google/login
pub async fn google_login(State(state): State<Arc<AppState>>, format: ResponseFormat) -> Response {
    login(&state, ProviderKind::Google, format)
}

/// GET /api/v2/auth/google/callback
pub async fn google_callback(
    State(state): State<Arc<AppState>>,
    format: ResponseFormat,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> Response {
    callback(&state, ProviderKind::Google, format, query).await
}

/// GET /api/v2/auth/facebook/login
pub async fn facebook_login(State(state): State<Arc<AppState>>, format: ResponseFormat) -> Response {
    login(&state, ProviderKind::Facebook, format)
}

/// GET /api/v2/auth/facebook/callback
pub async fn facebook_callback(
    State(state): State<Arc<AppState>>,
    format: ResponseFormat,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> Response {
    callback(&state, ProviderKind::Facebook, format, query).await
}

/// GET /api/v2/auth/github/login
pub async fn github_login(State(state): State<Arc<AppState>>, format: ResponseFormat) -> Response {
    login(&state, ProviderKind::Github, format)
}

/// GET /api/v2/auth/github/callback
pub async fn github_callback(
    State(state): State<Arc<AppState>>,
    format: ResponseFormat,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> Response {
    callback(&state, ProviderKind::Github, format, query).await
}

/// GET|POST /api/v2/auth/refresh
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
    format: ResponseFormat,
) -> Response {
    reply(format, StatusCode::CREATED, accounts::refresh_token(&state, &token).await)
}

/// GET /api/v2/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
    format: ResponseFormat,
) -> Response {
    reply(format, StatusCode::OK, accounts::current_user(&state, &token).await)
}
