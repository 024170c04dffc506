use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub oauth: OAuthConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub port: u16,
    pub default_page_limit: i64,
    pub max_page_limit: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    #[serde(skip_serializing)]
    pub hmac_secret: String,
    pub token_issuer: String,
    pub token_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

/// Client registration and endpoints for one OAuth2 provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    #[serde(skip_serializing)]
    pub client_state: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub google: ProviderConfig,
    pub facebook: ProviderConfig,
    pub github: ProviderConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("API_BASE_URL") {
            self.api.base_url = v;
        }
        if let Some(port) = env::var("API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_DEFAULT_PAGE_LIMIT") {
            self.api.default_page_limit = v.parse().unwrap_or(self.api.default_page_limit);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_LIMIT") {
            self.api.max_page_limit = v.parse().unwrap_or(self.api.max_page_limit);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_BACKEND") {
            self.database.backend = match v.as_str() {
                "memory" => StorageBackend::Memory,
                _ => StorageBackend::Postgres,
            };
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_HMAC_SECRET") {
            self.security.hmac_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_TOKEN_ISSUER") {
            self.security.token_issuer = v;
        }
        if let Ok(v) = env::var("SECURITY_TOKEN_EXPIRY_HOURS") {
            self.security.token_expiry_hours = v.parse().unwrap_or(self.security.token_expiry_hours);
        }

        // Logging overrides
        if let Ok(v) = env::var("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = env::var("LOG_JSON") {
            self.logging.json = v.parse().unwrap_or(self.logging.json);
        }

        // Provider overrides
        self.oauth.google.apply_env("GOOGLE");
        self.oauth.facebook.apply_env("FACEBOOK");
        self.oauth.github.apply_env("GITHUB");

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://127.0.0.1".to_string(),
                port: 8000,
                default_page_limit: 10,
                max_page_limit: 100,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                enable_cors: true,
                hmac_secret: String::new(),
                token_issuer: "blogrest-api".to_string(),
                token_expiry_hours: 24 * 14, // 2 weeks
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            oauth: OAuthConfig::default_endpoints(),
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.logging.json = true;
        config
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "http://127.0.0.1".to_string(),
                port: 8000,
                default_page_limit: 10,
                max_page_limit: 50,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                enable_cors: false,
                hmac_secret: String::new(),
                token_issuer: "blogrest-api".to_string(),
                token_expiry_hours: 24 * 14,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: true,
            },
            oauth: OAuthConfig::default_endpoints(),
        }
    }
}

impl OAuthConfig {
    fn default_endpoints() -> Self {
        Self {
            google: ProviderConfig::with_endpoints(
                "https://accounts.google.com/o/oauth2/auth",
                "https://oauth2.googleapis.com/token",
                "https://www.googleapis.com/oauth2/v2/userinfo",
            ),
            facebook: ProviderConfig::with_endpoints(
                "https://www.facebook.com/v3.2/dialog/oauth",
                "https://graph.facebook.com/v3.2/oauth/access_token",
                "https://graph.facebook.com/me",
            ),
            github: ProviderConfig::with_endpoints(
                "https://github.com/login/oauth/authorize",
                "https://github.com/login/oauth/access_token",
                "https://api.github.com/user",
            ),
        }
    }
}

impl ProviderConfig {
    fn with_endpoints(auth_url: &str, token_url: &str, userinfo_url: &str) -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            client_state: String::new(),
            redirect_url: String::new(),
            auth_url: auth_url.to_string(),
            token_url: token_url.to_string(),
            userinfo_url: userinfo_url.to_string(),
        }
    }

    fn apply_env(&mut self, prefix: &str) {
        let var = |name: &str| env::var(format!("{}_{}", prefix, name)).ok();

        if let Some(v) = var("CLIENT_ID") {
            self.client_id = v;
        }
        if let Some(v) = var("CLIENT_SECRET") {
            self.client_secret = v;
        }
        if let Some(v) = var("CLIENT_STATE") {
            self.client_state = v;
        }
        if let Some(v) = var("REDIRECT_URL") {
            self.redirect_url = v;
        }
        if let Some(v) = var("AUTH_URL") {
            self.auth_url = v;
        }
        if let Some(v) = var("TOKEN_URL") {
            self.token_url = v;
        }
        if let Some(v) = var("USERINFO_URL") {
            self.userinfo_url = v;
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.api.default_page_limit, 10);
        assert_eq!(config.api.max_page_limit, 100);
        assert_eq!(config.security.token_expiry_hours, 336);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.security.enable_cors);
        assert!(config.logging.json);
        assert_eq!(config.api.max_page_limit, 50);
    }

    #[test]
    fn provider_defaults_point_at_real_endpoints() {
        let config = AppConfig::development();
        assert_eq!(config.oauth.google.token_url, "https://oauth2.googleapis.com/token");
        assert_eq!(config.oauth.github.userinfo_url, "https://api.github.com/user");
        assert!(config.oauth.facebook.auth_url.contains("dialog/oauth"));
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut config = AppConfig::development();
        config.security.hmac_secret = "hunter2".to_string();
        config.oauth.google.client_secret = "s3cret".to_string();
        let dumped = serde_json::to_string(&config).unwrap();
        assert!(!dumped.contains("hunter2"));
        assert!(!dumped.contains("s3cret"));
    }
}
