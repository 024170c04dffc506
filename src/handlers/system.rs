use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

/// GET / - service description
pub async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "blogrest",
        "version": version,
        "environment": state.config.environment,
        "description": "Posts and comments REST API with OAuth2 sign-in",
        "endpoints": {
            "v1_posts": "/api/v1/posts[/:id] (writes require a bearer token)",
            "v1_comments": "/api/v1/comments[/:id] (writes require a bearer token)",
            "v2_posts": "/api/v2/posts[/:id] (writes require a bearer token)",
            "v2_comments": "/api/v2/comments[/:id] (writes require a bearer token)",
            "v2_auth": "/api/v2/auth/{google,facebook,github}/{login,callback}, /api/v2/auth/refresh, /api/v2/auth/me",
            "health": "/health",
        }
    }))
}

/// GET /health - liveness plus a storage ping
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
