use clap::Parser;

use blogrest::cli::{self, Cli};
use blogrest::{config, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and provider secrets are picked up
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize configuration (this loads the config singleton)
    logging::init(&config::config().logging);

    cli::run(cli).await
}
