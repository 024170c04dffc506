use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{encode_token, AccessToken};
use crate::config::{self, AppConfig, StorageBackend};
use crate::database::models::UserRole;
use crate::database::{MemoryStore, PgStore, Store};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "blogrest")]
#[command(about = "Posts and comments REST API with OAuth2 sign-in")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides API_PORT)")]
        port: Option<u16>,

        #[arg(long, help = "Keep data in memory instead of Postgres")]
        memory: bool,
    },

    #[command(about = "Apply the database schema to DATABASE_URL")]
    Migrate,

    #[command(about = "Print a signed access token")]
    Token {
        #[arg(long)]
        user_id: Uuid,

        #[arg(long, default_value = "user")]
        role: UserRole,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::config().clone();

    match cli.command {
        Commands::Serve { port, memory } => serve(config, port, memory).await,
        Commands::Migrate => migrate(&config).await,
        Commands::Token { user_id, role } => token(&config, user_id, role),
    }
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.database.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage, data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let store = PgStore::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            store.migrate().await.context("failed to apply schema")?;
            Ok(Arc::new(store))
        }
    }
}

async fn serve(mut config: AppConfig, port: Option<u16>, memory: bool) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.api.port = port;
    }
    if memory {
        config.database.backend = StorageBackend::Memory;
    }

    if config.security.hmac_secret.is_empty() {
        if crate::is_production!() {
            bail!("SECURITY_HMAC_SECRET must be set in production");
        }
        tracing::warn!("SECURITY_HMAC_SECRET is not set, authenticated routes will reject every token");
    }

    tracing::info!("Starting blogrest in {:?} mode", config.environment);

    let store = open_store(&config).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));
    let state = Arc::new(AppState::new(config, store));
    let app = crate::app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let store = PgStore::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    store.migrate().await.context("failed to apply schema")?;
    store.close().await;
    println!("schema applied");
    Ok(())
}

fn token(config: &AppConfig, user_id: Uuid, role: UserRole) -> anyhow::Result<()> {
    let claims = AccessToken::new(user_id, role, &config.security);
    let token = encode_token(&claims, &config.security.hmac_secret)
        .context("failed to sign token (is SECURITY_HMAC_SECRET set?)")?;
    println!("{}", token);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_flags() {
        let cli = Cli::try_parse_from(["blogrest", "serve", "--port", "9000", "--memory"]).unwrap();
        match cli.command {
            Commands::Serve { port, memory } => {
                assert_eq!(port, Some(9000));
                assert!(memory);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn parses_token_role() {
        let id = Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from(["blogrest", "token", "--user-id", &id, "--role", "admin"])
            .unwrap();
        match cli.command {
            Commands::Token { role, .. } => assert_eq!(role, UserRole::Admin),
            _ => panic!("expected token"),
        }
        assert!(Cli::try_parse_from(["blogrest", "token", "--user-id", "nope"]).is_err());
    }
}
