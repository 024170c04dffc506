pub mod oauth;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::{User, UserRole};

/// Upper bound on token lifetime, ten years.
pub const MAX_TOKEN_EXPIRY_HOURS: u64 = 24 * 365 * 10;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub user_id: Uuid,
    pub user_role: UserRole,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl AccessToken {
    pub fn new(user_id: Uuid, user_role: UserRole, security: &SecurityConfig) -> Self {
        let now = Utc::now();
        let hours = security.token_expiry_hours.min(MAX_TOKEN_EXPIRY_HOURS);
        let ttl = i64::try_from(hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or_else(|| Duration::days(1));
        let exp = (now + ttl).timestamp();

        Self {
            user_id,
            user_role,
            iss: security.token_issuer.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp,
        }
    }

    pub fn for_user(user: &User, security: &SecurityConfig) -> Self {
        Self::new(user.id, user.user_role, security)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token secret is not configured")]
    MissingSecret,

    #[error("Token generation error: {0}")]
    Generation(String),

    #[error("malformed token")]
    Malformed,
}

pub fn encode_token(token: &AccessToken, hmac_secret: &str) -> Result<String, TokenError> {
    if hmac_secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(hmac_secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), token, &encoding_key)
        .map_err(|e| TokenError::Generation(e.to_string()))
}

/// Verify signature, algorithm and time claims. Every failure, a missing
/// secret included, is `Malformed`.
pub fn decode_token(token: &str, hmac_secret: &str) -> Result<AccessToken, TokenError> {
    if hmac_secret.is_empty() {
        tracing::warn!("token secret is not configured, rejecting token");
        return Err(TokenError::Malformed);
    }

    let decoding_key = DecodingKey::from_secret(hmac_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.validate_nbf = true;

    decode::<AccessToken>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            TokenError::Malformed
        })
}
