pub mod comments;
pub mod posts;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::{ResponseBody, ResponseFormat};
use crate::error::ApiError;
use crate::middleware::require_token_plain;
use crate::state::AppState;

/// Successful bodies are negotiated, errors are written as plain text.
pub(crate) fn reply<T: ResponseBody>(
    format: ResponseFormat,
    status: StatusCode,
    result: Result<T, ApiError>,
) -> Response {
    match result {
        Ok(body) => format.respond(status, &body),
        Err(err) => err.into_response(),
    }
}

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/api/v1/posts", get(posts::list_posts))
        .route("/api/v1/posts/:id", get(posts::get_post))
        .route("/api/v1/comments", get(comments::list_comments))
        .route("/api/v1/comments/:id", get(comments::get_comment));

    let protected = Router::new()
        .route("/api/v1/posts", post(posts::create_post))
        .route(
            "/api/v1/posts/:id",
            put(posts::update_post).delete(posts::delete_post),
        )
        .route("/api/v1/comments", post(comments::create_comment))
        .route(
            "/api/v1/comments/:id",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route_layer(middleware::from_fn_with_state(state, require_token_plain));

    public.merge(protected)
}
