use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use agricost::cli::{self, Command};
use agricost::config::{DatabaseConfig, EngineConfig};
use agricost::predictor::PredictionService;
use agricost::store::{CostStore, PgStore};

/// Farm operating-cost prediction engine.
#[derive(Parser, Debug)]
#[command(name = "agricost", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agricost=info")),
        )
        .init();

    let cli = Cli::parse();

    let db_config = DatabaseConfig::from_env()
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let store = PgStore::new(&db_config).await?;
    store.run_migrations().await?;

    let store: Arc<dyn CostStore> = Arc::new(store);
    let service = PredictionService::new(store.clone(), EngineConfig::from_env());

    cli::run_command(cli.command, &service, &store).await
}
