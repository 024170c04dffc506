//! OAuth2 authorization-code flow against Google, Facebook and GitHub.

use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::{OAuthConfig, ProviderConfig};
use crate::database::models::AuthProviderType;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("invalid provider url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{0}")]
    Provider(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Google,
    Facebook,
    Github,
}

impl ProviderKind {
    pub fn scopes(self) -> &'static [&'static str] {
        match self {
            ProviderKind::Google => &["https://www.googleapis.com/auth/userinfo.email"],
            ProviderKind::Facebook => &["public_profile", "email"],
            ProviderKind::Github => &["user:email"],
        }
    }

    pub fn auth_provider_type(self) -> AuthProviderType {
        match self {
            ProviderKind::Google => AuthProviderType::Google,
            ProviderKind::Facebook => AuthProviderType::Facebook,
            ProviderKind::Github => AuthProviderType::Github,
        }
    }

    pub fn config(self, oauth: &OAuthConfig) -> &ProviderConfig {
        match self {
            ProviderKind::Google => &oauth.google,
            ProviderKind::Facebook => &oauth.facebook,
            ProviderKind::Github => &oauth.github,
        }
    }

    pub fn name(self) -> &'static str {
        self.auth_provider_type().as_str()
    }

    /// Message returned when the provider shares no email address.
    pub fn missing_email_message(self) -> &'static str {
        match self {
            ProviderKind::Github => "email address is required, make sure you have public email address set in your github account",
            _ => "email address is required",
        }
    }

    /// URL the user agent is redirected to in order to grant access.
    pub fn authorize_url(self, config: &ProviderConfig) -> Result<Url, OAuthError> {
        let scope = self.scopes().join(" ");
        let mut params = vec![
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_url.as_str()),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("state", config.client_state.as_str()),
        ];
        if self == ProviderKind::Google {
            params.push(("access_type", "offline"));
            params.push(("prompt", "consent"));
        }
        Ok(Url::parse_with_params(&config.auth_url, &params)?)
    }
}

/// Token endpoint response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderToken {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Identity fields shared by all providers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderProfile {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    picture: String,
}

#[derive(Debug, Deserialize)]
struct FacebookUser {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: i64,
    #[serde(default)]
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, OAuthError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(OAuthError::Status { status, body });
    }
    Ok(response.json::<T>().await?)
}

/// Exchange an authorization code for a provider token.
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &ProviderConfig,
    code: &str,
) -> Result<ProviderToken, OAuthError> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_url.as_str()),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];

    let response = http
        .post(&config.token_url)
        .header(ACCEPT, "application/json")
        .form(&form)
        .send()
        .await?;
    let token: ProviderToken = read_json(response).await?;

    if let Some(error) = &token.error {
        let detail = token.error_description.as_deref().unwrap_or(error);
        return Err(OAuthError::Provider(detail.to_string()));
    }
    if token.access_token.is_empty() {
        return Err(OAuthError::Provider(
            "server response missing access_token".to_string(),
        ));
    }
    Ok(token)
}

/// Fetch the signed-in user's profile from the provider.
pub async fn fetch_profile(
    http: &reqwest::Client,
    kind: ProviderKind,
    config: &ProviderConfig,
    access_token: &str,
) -> Result<ProviderProfile, OAuthError> {
    match kind {
        ProviderKind::Google => {
            let url = Url::parse_with_params(&config.userinfo_url, &[("access_token", access_token)])?;
            let user: GoogleUser = read_json(http.get(url).send().await?).await?;
            Ok(ProviderProfile {
                uid: user.id,
                email: user.email,
                name: String::new(),
                avatar_url: user.picture,
            })
        }
        ProviderKind::Facebook => {
            let url = Url::parse_with_params(
                &config.userinfo_url,
                &[("fields", "id,name,email"), ("access_token", access_token)],
            )?;
            let user: FacebookUser = read_json(http.get(url).send().await?).await?;
            Ok(ProviderProfile {
                uid: user.id,
                email: user.email,
                name: user.name,
                avatar_url: String::new(),
            })
        }
        ProviderKind::Github => {
            let response = http
                .get(&config.userinfo_url)
                .bearer_auth(access_token)
                .header(ACCEPT, "application/vnd.github+json")
                .header(USER_AGENT, concat!("blogrest/", env!("CARGO_PKG_VERSION")))
                .send()
                .await?;
            let user: GithubUser = read_json(response).await?;
            let name = user
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| user.login.clone());
            Ok(ProviderProfile {
                uid: user.id.to_string(),
                email: user.email.unwrap_or_default(),
                name,
                avatar_url: user.avatar_url.unwrap_or_default(),
            })
        }
    }
}
