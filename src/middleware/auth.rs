use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::ResponseFormat;
use crate::auth::{decode_token, AccessToken};
use crate::error::ApiError;
use crate::state::AppState;

/// Bearer-token authentication for v2 routes. Failures use the negotiated envelope.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &state.config.security.hmac_secret) {
        Ok(token) => {
            request.extensions_mut().insert(token);
            next.run(request).await
        }
        Err(err) => err.negotiated(ResponseFormat::from_headers(request.headers())),
    }
}

/// Bearer-token authentication for v1 routes. Failures are plain text.
pub async fn require_token_plain(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &state.config.security.hmac_secret) {
        Ok(token) => {
            request.extensions_mut().insert(token);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Validate the `Authorization` header and decode its token
pub fn authenticate(headers: &HeaderMap, hmac_secret: &str) -> Result<AccessToken, ApiError> {
    let token = extract_bearer(headers)?;

    tracing::debug!("decoding token");
    let claims = decode_token(token, hmac_secret).map_err(|e| {
        tracing::warn!(error = %e, "failed to decode token");
        ApiError::from(e)
    })?;

    tracing::debug!(user_id = %claims.user_id, "successfully authenticated request");
    Ok(claims)
}

/// Extract the token from `Authorization: Bearer <token>`
fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("");

    if value.is_empty() {
        tracing::warn!("empty authorization header");
        return Err(ApiError::unauthorized("empty authorization token"));
    }

    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => Ok(*token),
        _ => {
            tracing::warn!(parts = parts.len(), "malformed auth token");
            Err(ApiError::unauthorized("malformed auth token"))
        }
    }
}
