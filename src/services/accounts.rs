use serde::Deserialize;
use tracing::{error, info, instrument};
use url::Url;

use super::storage_failure;
use crate::api::responses::{TokenResponse, UserResponse};
use crate::auth::oauth::{self, ProviderKind, ProviderProfile, ProviderToken};
use crate::auth::{encode_token, AccessToken};
use crate::database::models::{NewAuthProvider, NewUser, User, UserRole};
use crate::error::ApiError;
use crate::state::AppState;

/// Query string the provider appends to the callback redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

pub fn login_url(state: &AppState, kind: ProviderKind) -> Result<Url, ApiError> {
    let provider = kind.config(&state.config.oauth);
    let url = kind.authorize_url(provider).map_err(|e| {
        error!(provider = kind.name(), error = %e, "failed to build authorization url");
        ApiError::internal_server_error("failed to build authorization url")
    })?;

    info!(provider = kind.name(), "successfully created redirect url");
    Ok(url)
}

fn new_user_from(kind: ProviderKind, profile: &ProviderProfile) -> NewUser {
    // Google only shares the avatar, Facebook only the display name.
    let (username, avatar_url) = match kind {
        ProviderKind::Google => (String::new(), profile.avatar_url.clone()),
        ProviderKind::Facebook => (profile.name.clone(), String::new()),
        ProviderKind::Github => (profile.name.clone(), profile.avatar_url.clone()),
    };

    NewUser {
        username,
        email: profile.email.clone(),
        avatar_url,
        user_role: UserRole::User,
    }
}

async fn find_or_register(
    state: &AppState,
    kind: ProviderKind,
    profile: &ProviderProfile,
) -> Result<User, ApiError> {
    info!("getting user from database");
    let existing = state
        .store
        .find_user_by_email(&profile.email)
        .await
        .map_err(|e| storage_failure(e, "failed to login user"))?;

    if let Some(user) = existing {
        return Ok(user);
    }

    info!("could not find user with this email, creating new user record");
    state
        .store
        .create_user(new_user_from(kind, profile))
        .await
        .map_err(|e| storage_failure(e, "failed to register new user"))
}

async fn link_provider(
    state: &AppState,
    kind: ProviderKind,
    user: &User,
    profile: &ProviderProfile,
    token: &ProviderToken,
) -> Result<(), ApiError> {
    let provider_type = kind.auth_provider_type();

    info!("getting auth provider from database");
    let existing = state
        .store
        .find_auth_provider(user.id, &profile.uid, provider_type)
        .await
        .map_err(|e| storage_failure(e, "failed to login user"))?;

    match (kind, existing) {
        // Google hands out a long-lived refresh token once, on first consent
        (ProviderKind::Google, Some(_)) => Ok(()),
        (ProviderKind::Google, None) => {
            info!("saving auth provider to database");
            state
                .store
                .create_auth_provider(NewAuthProvider {
                    user_id: user.id,
                    provider_uid: profile.uid.clone(),
                    auth_provider_type: provider_type,
                    refresh_token: token.refresh_token.clone(),
                })
                .await
                .map(|_| ())
                .map_err(|e| storage_failure(e, "failed to login user"))
        }
        (_, Some(link)) => {
            info!("updating auth provider in database");
            state
                .store
                .update_auth_provider_token(link.id, &token.access_token)
                .await
                .map_err(|e| storage_failure(e, "failed to login user"))
        }
        (_, None) if token.access_token.is_empty() => Ok(()),
        (_, None) => {
            info!("saving auth provider to database");
            state
                .store
                .create_auth_provider(NewAuthProvider {
                    user_id: user.id,
                    provider_uid: profile.uid.clone(),
                    auth_provider_type: provider_type,
                    refresh_token: token.access_token.clone(),
                })
                .await
                .map(|_| ())
                .map_err(|e| storage_failure(e, "failed to login user"))
        }
    }
}

fn sign(state: &AppState, user: &User, failure: &str) -> Result<String, ApiError> {
    info!("encoding jwt token");
    let claims = AccessToken::for_user(user, &state.config.security);
    encode_token(&claims, &state.config.security.hmac_secret).map_err(|e| {
        error!(error = %e, "failed to sign jwt token");
        ApiError::internal_server_error(failure)
    })
}

/// Complete the authorization-code flow and issue a session token.
#[instrument(name = "oauth_callback", skip_all, fields(provider = kind.name()))]
pub async fn complete_login(
    state: &AppState,
    kind: ProviderKind,
    params: &CallbackParams,
) -> Result<TokenResponse, ApiError> {
    let provider = kind.config(&state.config.oauth);

    info!("checking state");
    if params.state != provider.client_state {
        error!("invalid state");
        return Err(ApiError::unauthorized("invalid auth state"));
    }

    info!("exchanging token");
    let token = oauth::exchange_code(&state.http, provider, &params.code)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to exchange token");
            ApiError::unauthorized(format!("code exchange failed: {}", e))
        })?;

    info!("getting user info");
    let profile = oauth::fetch_profile(&state.http, kind, provider, &token.access_token)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to get user info");
            ApiError::unauthorized(format!("failed getting user info: {}", e))
        })?;

    if profile.email.trim().is_empty() {
        error!("user does not have email address");
        return Err(ApiError::forbidden(kind.missing_email_message()));
    }
    info!(uid = %profile.uid, "successfully authorized with provider");

    let user = find_or_register(state, kind, &profile).await?;
    link_provider(state, kind, &user, &profile, &token).await?;
    let jwt = sign(state, &user, "failed to login user")?;

    info!(user_id = %user.id, "successfully logged in");
    Ok(TokenResponse {
        token: jwt,
        message: "successfully logged in".to_string(),
    })
}

async fn load_user(state: &AppState, token: &AccessToken) -> Result<User, ApiError> {
    info!("getting user from database");
    state
        .store
        .find_user(token.user_id)
        .await
        .map_err(|e| storage_failure(e, "failed to find user"))?
        .ok_or_else(|| {
            error!("user from token no longer exists");
            ApiError::not_found("failed to find user")
        })
}

/// Issue a fresh token for the caller, re-reading their current role.
#[instrument(name = "refresh_token", skip_all, fields(user_id = %token.user_id))]
pub async fn refresh_token(state: &AppState, token: &AccessToken) -> Result<TokenResponse, ApiError> {
    let user = load_user(state, token).await?;
    let jwt = sign(state, &user, "failed to refresh token")?;

    info!("successfully refreshed token");
    Ok(TokenResponse {
        token: jwt,
        message: "successfully refreshed token".to_string(),
    })
}

#[instrument(name = "current_user", skip_all, fields(user_id = %token.user_id))]
pub async fn current_user(state: &AppState, token: &AccessToken) -> Result<UserResponse, ApiError> {
    let user = load_user(state, token).await?;

    Ok(UserResponse {
        user,
        message: "successfully retrieved user".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ProviderProfile {
        ProviderProfile {
            uid: "1".into(),
            email: "a@example.com".into(),
            name: "Ada".into(),
            avatar_url: "https://img/ada.png".into(),
        }
    }

    #[test]
    fn new_users_take_provider_specific_fields() {
        let google = new_user_from(ProviderKind::Google, &profile());
        assert_eq!(google.username, "");
        assert_eq!(google.avatar_url, "https://img/ada.png");

        let facebook = new_user_from(ProviderKind::Facebook, &profile());
        assert_eq!(facebook.username, "Ada");
        assert_eq!(facebook.avatar_url, "");

        let github = new_user_from(ProviderKind::Github, &profile());
        assert_eq!(github.username, "Ada");
        assert_eq!(github.avatar_url, "https://img/ada.png");
        assert_eq!(github.user_role, UserRole::User);
    }
}
