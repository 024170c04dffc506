pub mod auth;
pub mod comments;
pub mod posts;

use axum::{
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::{ResponseBody, ResponseFormat};
use crate::error::ApiError;
use crate::middleware::require_token;
use crate::state::AppState;

/// Render a service result, errors included, in the negotiated format.
pub(crate) fn reply<T: ResponseBody>(
    format: ResponseFormat,
    status: StatusCode,
    result: Result<T, ApiError>,
) -> Response {
    match result {
        Ok(body) => format.respond(status, &body),
        Err(err) => err.negotiated(format),
    }
}

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/api/v2/posts", get(posts::list_posts))
        .route("/api/v2/posts/:id", get(posts::get_post))
        .route("/api/v2/comments", get(comments::list_comments))
        .route("/api/v2/comments/:id", get(comments::get_comment))
        .route("/api/v2/auth/google/login", get(auth::google_login))
        .route("/api/v2/auth/google/callback", get(auth::google_callback))
        .route("/api/v2/auth/facebook/login", get(auth::facebook_login))
        .route("/api/v2/auth/facebook/callback", get(auth::facebook_callback))
        .route("/api/v2/auth/github/login", get(auth::github_login))
        .route("/api/v2/auth/github/callback", get(auth::github_callback));

    let protected = Router::new()
        .route("/api/v2/posts", post(posts::create_post))
        .route(
            "/api/v2/posts/:id",
            put(posts::update_post).delete(posts::delete_post),
        )
        .route("/api/v2/comments", post(comments::create_comment))
        .route(
            "/api/v2/comments/:id",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route(
            "/api/v2/auth/refresh",
            get(auth::refresh_token).post(auth::refresh_token),
        )
        .route("/api/v2/auth/me", get(auth::me))
        .route_layer(middleware::from_fn_with_state(state, require_token));

    public.merge(protected)
}
