use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::config;
use crate::database::DatabaseManager;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "agora")]
#[command(about = "Agora API - role-scoped REST backend for boards, communities, a marketplace and todo lists")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply the schema and start the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overrides AGORA_API_PORT / PORT")]
        port: Option<u16>,
    },

    #[command(about = "Apply the schema and exit")]
    Migrate,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(port).await,
        Commands::Migrate => migrate().await,
    }
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let config = config();
    info!("Starting Agora API in {:?} mode", config.environment);

    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await?;

    let bind_addr = format!("{}:{}", config.server.host, port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    info!("Agora API listening on http://{}", bind_addr);
    axum::serve(listener, crate::app(AppState::new(pool))).await?;
    Ok(())
}

async fn migrate() -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config().database).await?;
    DatabaseManager::migrate(&pool).await?;
    pool.close().await;
    Ok(())
}
