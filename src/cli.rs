use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::{self, AppConfig};
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};
use crate::server;

#[derive(Parser)]
#[command(name = "board-api")]
#[command(about = "Kanban board backend - REST API and notification websocket")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "YAML config file; environment variables still override it")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP and websocket server")]
    Serve {
        #[arg(long, help = "Listen port (overrides server.port)")]
        port: Option<u16>,

        #[arg(long, help = "Keep all data in process memory instead of Postgres")]
        in_memory: bool,
    },

    #[command(about = "Apply pending database migrations and exit")]
    Migrate,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => config::config().clone(),
    };
    config.validate()?;
    Ok(config)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Serve { port, in_memory } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            info!("Starting board-api in {:?} mode", config.environment);

            let store: Arc<dyn Store> = if in_memory {
                warn!("Using in-memory store; data is lost on exit");
                Arc::new(MemoryStore::new())
            } else {
                let pool = DatabaseManager::connect(&config.database).await?;
                if config.database.run_migrations {
                    DatabaseManager::migrate(&pool).await?;
                }
                Arc::new(PgStore::new(pool))
            };

            let app = server::build_app(store, Arc::new(config));
            server::serve(app).await
        }
        Commands::Migrate => {
            let pool = DatabaseManager::connect(&config.database).await?;
            DatabaseManager::migrate(&pool).await?;
            pool.close().await;
            Ok(())
        }
    }
}
